use autopilot_core::config::Config;

pub fn execute(config: &Config) -> anyhow::Result<()> {
    print!("{}", render(config));
    Ok(())
}

fn render(config: &Config) -> String {
    let mut out = String::new();
    for line in config.redacted_lines() {
        out.push_str(&line);
        out.push('\n');
    }
    let warnings = config.warnings();
    if warnings.is_empty() {
        out.push_str("\nConfiguration OK\n");
    } else {
        out.push_str("\nMissing:\n");
        for warning in warnings {
            out.push_str(&format!("  {warning}\n"));
        }
    }
    out
}
