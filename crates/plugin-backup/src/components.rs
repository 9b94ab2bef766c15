//! Backup admin screens.

use awcms_plugin::prelude::*;

/// Backup list with create and restore actions.
#[derive(Debug, Default)]
pub struct BackupManager;

impl Component for BackupManager {
    fn name(&self) -> &str {
        "BackupManager"
    }

    fn render(&self, props: &Value) -> String {
        let backups = props
            .get("backups")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let rows: String = if backups.is_empty() {
            r#"<tr><td colspan="3">No backups yet.</td></tr>"#.to_string()
        } else {
            backups
                .iter()
                .map(|b| {
                    format!(
                        "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                        escape_html(b["name"].as_str().unwrap_or("backup")),
                        escape_html(b["created_at"].as_str().unwrap_or("")),
                        escape_html(b["size"].as_str().unwrap_or("")),
                    )
                })
                .collect()
        };

        format!(
            concat!(
                r#"<section class="backup-manager"><h2>Backups</h2>"#,
                r#"<button data-action="backup.create">Create backup</button>"#,
                "<table><thead><tr><th>Name</th><th>Created</th><th>Size</th></tr></thead>",
                "<tbody>{}</tbody></table></section>"
            ),
            rows
        )
    }
}

/// Automated backup schedule form.
#[derive(Debug, Default)]
pub struct BackupScheduler;

const FREQUENCIES: [&str; 3] = ["daily", "weekly", "monthly"];

impl Component for BackupScheduler {
    fn name(&self) -> &str {
        "BackupScheduler"
    }

    fn render(&self, props: &Value) -> String {
        let frequency = props["frequency"].as_str().unwrap_or("daily");
        let time = props["time"].as_str().unwrap_or("00:00");

        let options: String = FREQUENCIES
            .iter()
            .map(|f| {
                let selected = if *f == frequency { " selected" } else { "" };
                format!(r#"<option value="{f}"{selected}>{f}</option>"#)
            })
            .collect();

        format!(
            concat!(
                r#"<section class="backup-scheduler"><h2>Backup Schedule</h2>"#,
                r#"<label>Frequency <select name="frequency">{}</select></label>"#,
                r#"<label>Time (UTC) <input type="time" name="time" value="{}"></label>"#,
                r#"<button data-action="backup.schedule">Save Schedule</button></section>"#
            ),
            options,
            escape_html(time)
        )
    }
}

/// Backup retention and storage settings.
#[derive(Debug, Default)]
pub struct BackupSettings;

impl Component for BackupSettings {
    fn name(&self) -> &str {
        "BackupSettings"
    }

    fn render(&self, props: &Value) -> String {
        let retention = props["retention_days"].as_u64().unwrap_or(30);
        let storage = props["storage"].as_str().unwrap_or("local");

        format!(
            concat!(
                r#"<section class="backup-settings"><h2>Backup Settings</h2>"#,
                r#"<label>Retention (days) <input type="number" name="retention_days" value="{}"></label>"#,
                r#"<label>Storage <input name="storage" value="{}"></label></section>"#
            ),
            retention,
            escape_html(storage)
        )
    }
}
