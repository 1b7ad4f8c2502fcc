use crate::Result;
use crate::model::ReportData;
use anyhow::Context;
use std::fs;

/// Pretty JSON, the document downstream renderers consume.
pub fn render_json_report(data: &ReportData) -> Result<String> {
    let mut json = serde_json::to_string_pretty(data).context("serialize report")?;
    json.push('\n');
    Ok(json)
}

pub fn write_report(data: &ReportData, out: &str) -> Result<()> {
    let json = render_json_report(data)?;
    fs::write(out, json).with_context(|| format!("write report {}", out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::tests::{BASE, WITHOUT_R2};
    use crate::layout::LayoutConfig;
    use crate::model::build_report_data;
    use crate::refresh::Session;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    #[test]
    fn report_uses_kebab_case_tags() {
        let mut s = Session::new(LayoutConfig::default(), 10_000).unwrap();
        s.refresh(BASE, 0);
        let status = s.refresh(WITHOUT_R2, 1_000);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let data = build_report_data("dump.txt", &s, &status, at).unwrap();

        let json = render_json_report(&data).unwrap();
        assert!(json.ends_with("}\n"));

        let v: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["status"]["state"], "updated");
        assert_eq!(v["status"]["changes"], 2);
        assert_eq!(v["algorithm"], "force");
        assert_eq!(v["changes"][0]["kind"], "router-removed");

        let tombstone = v["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["id"] == "2.2.2.2")
            .unwrap();
        assert_eq!(tombstone["status"], "removed");
        assert_eq!(tombstone["at"], 1_000);
        assert_eq!(tombstone["role"], "internal");

        let edge = &v["edges"][0];
        assert_eq!(edge["kind"], "point-to-point");
        assert_eq!(edge["status"], "stable");
    }
}
