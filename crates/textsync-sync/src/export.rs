//! Locale JSON serialization of reviewed records.
//!
//! Output is a flat key→value mapping with stable key order, either split
//! into one file per language under `{parent}/{lang}/{file}` or folded into
//! a single file with non-primary keys suffixed `_{lang}`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use textsync_core::{Project, TextRecord, TextStatus};
use thiserror::Error;

/// What makes a record eligible for export.
///
/// The observed conventions diverge, so this is an explicit flag rather
/// than a silent pick. `ApprovedStatus` is the documented default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportGate {
    /// `status == approved` (the legacy `done` spelling is normalised to
    /// `approved` when parsing, never here).
    #[default]
    ApprovedStatus,
    /// A non-empty translation is present, status notwithstanding.
    Translated,
}

impl ExportGate {
    fn admits(self, record: &TextRecord) -> bool {
        match self {
            ExportGate::ApprovedStatus => record.status == TextStatus::Approved,
            ExportGate::Translated => {
                record.translation.as_deref().is_some_and(|t| !t.is_empty())
            }
        }
    }
}

/// An export-gate name that is neither `approved` nor `translated`.
#[derive(Debug, Error)]
#[error("unknown export gate: {0}")]
pub struct UnknownGate(pub String);

impl FromStr for ExportGate {
    type Err = UnknownGate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(ExportGate::ApprovedStatus),
            "translated" => Ok(ExportGate::Translated),
            other => Err(UnknownGate(other.to_string())),
        }
    }
}

impl fmt::Display for ExportGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportGate::ApprovedStatus => "approved",
            ExportGate::Translated => "translated",
        })
    }
}

/// Which language column of a record an export draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LangRole {
    /// The document language: `value`.
    Source,
    /// The translated language: `translation`.
    Target,
}

/// One locale file ready to be written or pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleFile {
    /// Repository-relative path.
    pub path: String,
    /// Pretty-printed JSON object.
    pub content: String,
    /// How many keys made it through the gate.
    pub keys: usize,
}

/// Flat key→value mapping of the gated records for one language role.
///
/// Target-language entries without a translation are omitted, not emitted
/// empty.
pub fn locale_map(
    records: &[TextRecord],
    role: LangRole,
    gate: ExportGate,
) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for record in records {
        if !gate.admits(record) {
            continue;
        }
        let value = match role {
            LangRole::Source => Some(record.value.as_str()),
            LangRole::Target => record.translation.as_deref().filter(|t| !t.is_empty()),
        };
        if let Some(value) = value {
            map.insert(record.key.clone(), value.to_string());
        }
    }
    map
}

/// Split the configured repository path into parent directory and file
/// name. `locales/text.json` → (`locales`, `text.json`); bare file names
/// fall under `locales/`.
pub fn split_path(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        Some((parent, file)) if !parent.is_empty() => (parent.to_string(), file.to_string()),
        Some((_, file)) => ("locales".to_string(), file.to_string()),
        None if path.is_empty() => ("locales".to_string(), "text.json".to_string()),
        None => ("locales".to_string(), path.to_string()),
    }
}

/// One file per language: `{parent}/{source_lang}/{file}` and
/// `{parent}/{target_lang}/{file}`.
pub fn locale_files(records: &[TextRecord], project: &Project, gate: ExportGate) -> Vec<LocaleFile> {
    let (parent, file) = split_path(&project.github.path);
    [
        (&project.source_lang, LangRole::Source),
        (&project.target_lang, LangRole::Target),
    ]
    .into_iter()
    .map(|(lang, role)| {
        let map = locale_map(records, role, gate);
        LocaleFile {
            path: format!("{parent}/{lang}/{file}"),
            keys: map.len(),
            content: pretty(&map),
        }
    })
    .collect()
}

/// Single-file variant: source keys plain, target keys suffixed
/// `_{target_lang}`.
pub fn suffixed_file(records: &[TextRecord], project: &Project, gate: ExportGate) -> LocaleFile {
    let mut map = locale_map(records, LangRole::Source, gate);
    for (key, value) in locale_map(records, LangRole::Target, gate) {
        map.insert(format!("{key}_{}", project.target_lang), value);
    }
    LocaleFile {
        path: project.github.path.clone(),
        keys: map.len(),
        content: pretty(&map),
    }
}

fn pretty(map: &BTreeMap<String, String>) -> String {
    // BTreeMap keeps key order stable across exports; serde_json's pretty
    // printer emits the 2-space indentation the locale consumers expect.
    let mut out = serde_json::to_string_pretty(map).unwrap_or_else(|_| "{}".to_string());
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use textsync_core::{GitHubTarget, Sources};

    use super::*;

    fn record(key: &str, value: &str, translation: Option<&str>, status: TextStatus) -> TextRecord {
        TextRecord {
            key: key.into(),
            project_id: "p1".into(),
            value: value.into(),
            translation: translation.map(str::to_string),
            status,
            category: "c".into(),
            sources: Sources::default(),
            created_at: "2026-08-01T00:00:00Z".into(),
            updated_at: "2026-08-01T00:00:00Z".into(),
        }
    }

    fn project() -> Project {
        Project {
            id: "p1".into(),
            name: "Web".into(),
            github: GitHubTarget {
                owner: "acme".into(),
                repo: "web".into(),
                branch: "main".into(),
                path: "locales/text.json".into(),
                token: "ghp_x".into(),
            },
            source_lang: "en".into(),
            target_lang: "ru".into(),
            is_active: true,
        }
    }

    #[test]
    fn approved_gate_admits_only_approved() {
        let records = vec![
            record("a", "A", None, TextStatus::Approved),
            record("b", "B", Some("Б"), TextStatus::Draft),
            record("c", "C", None, TextStatus::InReview),
        ];
        let map = locale_map(&records, LangRole::Source, ExportGate::ApprovedStatus);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a").map(String::as_str), Some("A"));
    }

    #[test]
    fn translated_gate_admits_by_translation_presence() {
        let records = vec![
            record("a", "A", None, TextStatus::Approved),
            record("b", "B", Some("Б"), TextStatus::Draft),
            record("c", "C", Some(""), TextStatus::Approved),
        ];
        let map = locale_map(&records, LangRole::Target, ExportGate::Translated);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("b").map(String::as_str), Some("Б"));
    }

    #[test]
    fn target_map_omits_missing_translations() {
        let records = vec![
            record("a", "A", Some("А"), TextStatus::Approved),
            record("b", "B", None, TextStatus::Approved),
        ];
        let map = locale_map(&records, LangRole::Target, ExportGate::ApprovedStatus);
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key("b"));
    }

    #[test]
    fn keys_are_sorted_in_output() {
        let records = vec![
            record("zebra", "Z", None, TextStatus::Approved),
            record("alpha", "A", None, TextStatus::Approved),
        ];
        let file = &locale_files(&records, &project(), ExportGate::ApprovedStatus)[0];
        let alpha_at = file.content.find("alpha").unwrap();
        let zebra_at = file.content.find("zebra").unwrap();
        assert!(alpha_at < zebra_at);
    }

    #[test]
    fn split_path_variants() {
        assert_eq!(split_path("locales/text.json"), ("locales".into(), "text.json".into()));
        assert_eq!(split_path("i18n/app/strings.json"), ("i18n/app".into(), "strings.json".into()));
        assert_eq!(split_path("text.json"), ("locales".into(), "text.json".into()));
        assert_eq!(split_path(""), ("locales".into(), "text.json".into()));
        assert_eq!(split_path("/text.json"), ("locales".into(), "text.json".into()));
    }

    #[test]
    fn per_language_files_have_language_paths() {
        let records = vec![record("a", "Hello", Some("Привет"), TextStatus::Approved)];
        let files = locale_files(&records, &project(), ExportGate::ApprovedStatus);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "locales/en/text.json");
        assert_eq!(files[1].path, "locales/ru/text.json");
        assert!(files[0].content.contains("\"Hello\""));
        assert!(files[1].content.contains("\"Привет\""));
        assert_eq!(files[0].keys, 1);
    }

    #[test]
    fn suffixed_file_tags_target_keys() {
        let records = vec![record("a", "Hello", Some("Привет"), TextStatus::Approved)];
        let file = suffixed_file(&records, &project(), ExportGate::ApprovedStatus);
        assert_eq!(file.path, "locales/text.json");
        let map: BTreeMap<String, String> = serde_json::from_str(&file.content).unwrap();
        assert_eq!(map.get("a").map(String::as_str), Some("Hello"));
        assert_eq!(map.get("a_ru").map(String::as_str), Some("Привет"));
    }

    #[test]
    fn gate_parses_both_spellings() {
        assert_eq!("approved".parse::<ExportGate>().unwrap(), ExportGate::ApprovedStatus);
        assert_eq!("translated".parse::<ExportGate>().unwrap(), ExportGate::Translated);
        assert!("shipped".parse::<ExportGate>().is_err());
        assert_eq!(ExportGate::default(), ExportGate::ApprovedStatus);
    }

    #[test]
    fn output_is_pretty_json_with_trailing_newline() {
        let records = vec![record("a", "A", None, TextStatus::Approved)];
        let file = &locale_files(&records, &project(), ExportGate::ApprovedStatus)[0];
        assert!(file.content.starts_with("{\n  \"a\""));
        assert!(file.content.ends_with("}\n"));
    }
}
