use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Issues ──

/// Issue metadata as reported by the tracker.
///
/// Only `filename` and `file` are read by the diagnosis; every other key is kept
/// verbatim in `extra` so it survives a round trip to the calling agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IssueMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl IssueMetadata {
    /// First non-empty of `filename`, `file`.
    pub fn source_file(&self) -> Option<&str> {
        [self.filename.as_deref(), self.file.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }
}

/// Snapshot of one issue as listed by the tracker. Never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub short_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default)]
    pub culprit: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default, alias = "count", deserialize_with = "lenient_count")]
    pub event_count: u64,
    #[serde(default)]
    pub first_seen: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub metadata: IssueMetadata,
}

/// Full issue as returned by the detail endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetail {
    #[serde(flatten)]
    pub summary: IssueSummary,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub annotations: Vec<Value>,
    #[serde(default)]
    pub assigned_to: Option<Value>,
}

// ── Events ──

/// One concrete occurrence of an issue.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssueEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "eventID")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "dateCreated")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub entries: Vec<EventEntry>,
    #[serde(default)]
    pub exception: Option<Value>,
    #[serde(default)]
    pub contexts: Option<Value>,
    #[serde(default)]
    pub tags: Option<Value>,
}

/// A typed event entry. Unknown tags, and known tags whose payload does not
/// decode, are kept as `Other`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawEntry")]
pub enum EventEntry {
    Exception(ExceptionEntry),
    Message(MessageEntry),
    Other { kind: String, data: Option<Value> },
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
}

impl From<RawEntry> for EventEntry {
    fn from(raw: RawEntry) -> Self {
        let decoded = match (raw.kind.as_str(), &raw.data) {
            ("exception", Some(data)) => ExceptionEntry::deserialize(data)
                .ok()
                .map(EventEntry::Exception),
            ("message", Some(data)) => MessageEntry::deserialize(data)
                .ok()
                .map(EventEntry::Message),
            _ => None,
        };
        decoded.unwrap_or(EventEntry::Other {
            kind: raw.kind,
            data: raw.data,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExceptionEntry {
    #[serde(default, deserialize_with = "lenient_list")]
    pub values: Vec<ExceptionValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExceptionValue {
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub stacktrace: Option<Stacktrace>,
}

impl ExceptionValue {
    pub fn frames(&self) -> &[StackFrame] {
        self.stacktrace
            .as_ref()
            .map(|s| s.frames.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Stacktrace {
    #[serde(default, deserialize_with = "lenient_list")]
    pub frames: Vec<StackFrame>,
}

/// One call-stack entry. Accepts both the ingest shape (`abs_path`, `lineno`,
/// `in_app`, `pre_context`...) and the web API shape (`absPath`, `lineNo`,
/// `inApp`, `context: [[n, text]]`).
///
/// Every field decodes leniently: a malformed value reads as absent, so a frame
/// with a usable path is never lost to a bad line number or scrubbed context.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StackFrame {
    #[serde(default, deserialize_with = "lenient_string")]
    pub filename: Option<String>,
    #[serde(default, alias = "absPath", deserialize_with = "lenient_string")]
    pub abs_path: Option<String>,
    #[serde(default, alias = "lineNo", deserialize_with = "lenient_line")]
    pub lineno: Option<u32>,
    #[serde(default, alias = "inApp", deserialize_with = "lenient_bool")]
    pub in_app: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub function: Option<String>,
    #[serde(default, deserialize_with = "lenient_lines")]
    pub pre_context: Vec<Option<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub context_line: Option<String>,
    #[serde(default, deserialize_with = "lenient_lines")]
    pub post_context: Vec<Option<String>>,
    #[serde(default, deserialize_with = "lenient_numbered_lines")]
    pub context: Vec<(u32, Option<String>)>,
}

impl StackFrame {
    /// The frame's file reference: `filename` if non-empty, else `abs_path`.
    pub fn raw_path(&self) -> Option<&str> {
        [self.filename.as_deref(), self.abs_path.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageEntry {
    #[serde(default)]
    pub formatted: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ── Repository ──

/// A file fetched from the source repository at a ref.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoFile {
    pub path: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
}

/// A rendered window of a repository file around one line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepoContext {
    pub file_path: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub line: u32,
    pub start_line: u32,
    pub end_line: u32,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
}

/// Input for opening a pull request. `base` falls back to the repository's
/// default ref.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPullRequest {
    pub head: String,
    pub base: Option<String>,
    pub title: String,
    pub body: String,
    pub draft: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequest {
    pub url: String,
    pub number: u64,
    pub title: String,
}

// ── Diagnosis ──

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssueRef {
    pub id: String,
    pub short_id: String,
    pub title: String,
    pub culprit: Option<String>,
    pub permalink: Option<String>,
}

impl From<&IssueDetail> for IssueRef {
    fn from(issue: &IssueDetail) -> Self {
        let s = &issue.summary;
        Self {
            id: s.id.clone(),
            short_id: s.short_id.clone(),
            title: s.title.clone(),
            culprit: s.culprit.clone(),
            permalink: s.permalink.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Location {
    pub path: String,
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
}

/// Outcome of diagnosing one issue. Recomputed on every request.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub issue: IssueRef,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried_paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Lenient decoding helpers ──

/// Treat an explicit `null` like a missing field.
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode an array element by element, dropping elements that do not decode.
/// Anything other than an array reads as empty.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| T::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// A nested value that reads as `None` when it does not decode.
pub fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| T::deserialize(v).ok()))
}

pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|v| v.as_bool())
        .unwrap_or(false))
}

/// A line number, or `None` for anything that is not a non-negative integer
/// in range.
pub fn lenient_line<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(line_from_value))
}

pub fn line_from_value(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

/// Source lines where scrubbed or non-string entries read as `None`.
pub fn lenient_lines<'de, D>(deserializer: D) -> Result<Vec<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// `[[line, text], ...]` pairs. Pairs without a usable line number are skipped.
pub fn lenient_numbered_lines<'de, D>(
    deserializer: D,
) -> Result<Vec<(u32, Option<String>)>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::Array(items)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .filter_map(|item| {
            let pair = item.as_array()?;
            let line = line_from_value(pair.first()?)?;
            let text = pair.get(1).and_then(Value::as_str).map(str::to_string);
            Some((line, text))
        })
        .collect())
}

/// Decode a count that the tracker may send as a number or a numeric string.
pub fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(count_from_value).unwrap_or(0))
}

/// Numbers pass through, strings are read up to the first non-digit, anything
/// else counts as zero.
pub fn count_from_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        Value::String(s) => {
            let digits: String = s
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    }
}
