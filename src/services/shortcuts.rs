//! Rewrites the icon reference of desktop shortcuts that launch a Steam game.
//!
//! Two text formats are handled:
//! - Windows Internet Shortcuts (`.url`): flat `Key=Value` lines with a
//!   `URL=steam://rungameid/<id>` launch line and an `IconFile=` icon line.
//! - XDG desktop entries (`.desktop`): a `[Desktop Entry]` section with an
//!   `Exec=` launch line and an `Icon=` icon line.
//!
//! Each shortcut is classified independently (see [`ShortcutEdit`]); a file
//! that cannot be read or written is skipped without stopping the scan.

use crate::services::ApplyError;
use crate::services::matcher::file_type_of;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use regex::Regex;
use std::fs;

/// Shortcut file flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutFormat {
    /// `.url`
    InternetShortcut,
    /// `.desktop`
    DesktopEntry,
}

impl ShortcutFormat {
    pub fn for_platform() -> Self {
        if cfg!(target_os = "windows") {
            ShortcutFormat::InternetShortcut
        } else {
            ShortcutFormat::DesktopEntry
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ShortcutFormat::InternetShortcut => "url",
            ShortcutFormat::DesktopEntry => "desktop",
        }
    }

    fn icon_key(self) -> &'static str {
        match self {
            ShortcutFormat::InternetShortcut => "IconFile=",
            ShortcutFormat::DesktopEntry => "Icon=",
        }
    }

    /// Pick the applied icon (by file type) shortcuts of this format should show.
    ///
    /// `.url` shortcuts need an `.ico`; desktop entries prefer a `.jpg`.
    pub fn preferred_icon(self, applied: &IndexMap<String, Utf8PathBuf>) -> Option<&Utf8Path> {
        let order: &[&str] = match self {
            ShortcutFormat::InternetShortcut => &["ico"],
            ShortcutFormat::DesktopEntry => &["jpg", "ico"],
        };
        order
            .iter()
            .find_map(|ty| applied.get(*ty))
            .map(|p| p.as_path())
    }

    /// Point the shortcut at `icon`. `None` when nothing would change.
    pub fn rewrite(self, content: &str, icon: &Utf8Path) -> Option<String> {
        let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
        self.plan(&lines, icon)?.apply(&mut lines, |line| line);
        Some(lines.join("\n"))
    }

    /// Byte-level [`rewrite`](Self::rewrite): lines that are not touched keep
    /// their exact bytes, whatever their encoding.
    pub fn rewrite_bytes(self, content: &[u8], icon: &Utf8Path) -> Option<Vec<u8>> {
        let mut raw: Vec<Vec<u8>> = content.split(|b| *b == b'\n').map(<[u8]>::to_vec).collect();
        let text: Vec<String> = raw
            .iter()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect();

        self.plan(&text, icon)?.apply(&mut raw, String::into_bytes);
        Some(raw.join(&b'\n'))
    }

    fn plan(self, lines: &[String], icon: &Utf8Path) -> Option<LineEdit> {
        match self {
            ShortcutFormat::InternetShortcut => plan_internet_shortcut(lines, icon),
            ShortcutFormat::DesktopEntry => plan_desktop_entry(lines, icon),
        }
    }
}

/// A single change to a shortcut's lines
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineEdit {
    Replace(usize, String),
    Insert(usize, Vec<String>),
}

impl LineEdit {
    fn apply<T>(self, lines: &mut Vec<T>, convert: impl Fn(String) -> T) {
        match self {
            LineEdit::Replace(index, line) => lines[index] = convert(line),
            LineEdit::Insert(index, new_lines) => {
                lines.splice(index..index, new_lines.into_iter().map(convert));
            }
        }
    }
}

/// Line text without a trailing carriage return.
fn body(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Build a line using the same line ending as `like`.
fn line_like(like: &str, text: String) -> String {
    if like.ends_with('\r') {
        text + "\r"
    } else {
        text
    }
}

/// Replace the line at `index` unless it already holds `text`.
fn replace_line(lines: &[String], index: usize, text: String) -> Option<LineEdit> {
    if body(&lines[index]) == text {
        return None;
    }
    Some(LineEdit::Replace(index, line_like(&lines[index], text)))
}

fn plan_internet_shortcut(lines: &[String], icon: &Utf8Path) -> Option<LineEdit> {
    let key = ShortcutFormat::InternetShortcut.icon_key();
    let icon_line = format!("{}{}", key, icon);

    if let Some(index) = lines.iter().position(|l| l.starts_with(key)) {
        return replace_line(lines, index, icon_line);
    }

    let url_index = lines.iter().position(|l| l.starts_with("URL="))?;
    let anchor = &lines[url_index];
    Some(LineEdit::Insert(
        url_index + 1,
        vec![
            line_like(anchor, icon_line),
            line_like(anchor, "IconIndex=0".to_string()),
        ],
    ))
}

fn plan_desktop_entry(lines: &[String], icon: &Utf8Path) -> Option<LineEdit> {
    let key = ShortcutFormat::DesktopEntry.icon_key();
    let icon_line = format!("{}{}", key, icon);

    let header = lines.iter().position(|l| body(l).trim() == "[Desktop Entry]")?;
    let section_end = lines[header + 1..]
        .iter()
        .position(|l| l.starts_with('['))
        .map_or(lines.len(), |offset| header + 1 + offset);
    let section = &lines[header + 1..section_end];

    if let Some(index) = section.iter().position(|l| l.starts_with(key)) {
        return replace_line(lines, header + 1 + index, icon_line);
    }

    // After Exec=, else after the last non-blank line of the section
    let insert_at = section
        .iter()
        .position(|l| l.starts_with("Exec="))
        .or_else(|| section.iter().rposition(|l| !body(l).trim().is_empty()))
        .map_or(header + 1, |index| header + 1 + index + 1);
    let anchor = &lines[insert_at - 1];
    Some(LineEdit::Insert(insert_at, vec![line_like(anchor, icon_line)]))
}

/// Launch identifiers that mark a shortcut as belonging to `app_id`.
pub fn launch_identifiers(app_id: u64) -> Vec<String> {
    vec![
        format!("steam://rungameid/{}", app_id),
        format!("steam://run/{}", app_id),
        format!("\"steam://rungameid/{}\"", app_id),
        format!("\"steam://run/{}\"", app_id),
    ]
}

/// Regex matching any launch identifier not followed by another digit.
pub fn launch_pattern(app_id: u64) -> Result<Regex, regex::Error> {
    let alternatives: Vec<String> = launch_identifiers(app_id)
        .iter()
        .map(|id| regex::escape(id))
        .collect();
    Regex::new(&format!(r"(?:{})(?:\D|$)", alternatives.join("|")))
}

/// Classification of one scanned shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutEdit {
    /// Icon line replaced or inserted and the file written back
    Updated,
    /// Launches the game but already shows the icon, or has no line to anchor on
    Unchanged,
    /// Launches something else
    NotMatched,
}

/// Scans desktop folders for shortcuts of one format
#[derive(Debug, Clone)]
pub struct ShortcutUpdater {
    format: ShortcutFormat,
    desktop_dirs: Vec<Utf8PathBuf>,
}

impl ShortcutUpdater {
    pub fn new(format: ShortcutFormat, desktop_dirs: Vec<Utf8PathBuf>) -> Self {
        Self {
            format,
            desktop_dirs,
        }
    }

    /// Updater for the current platform's format and desktop folders.
    pub fn for_platform() -> Self {
        Self::new(ShortcutFormat::for_platform(), platform_desktop_dirs())
    }

    pub fn format(&self) -> ShortcutFormat {
        self.format
    }

    pub fn desktop_dirs(&self) -> &[Utf8PathBuf] {
        &self.desktop_dirs
    }

    /// Rewrite one shortcut file if it launches the game matched by `pattern`.
    pub fn update_file(
        &self,
        path: &Utf8Path,
        pattern: &Regex,
        icon: &Utf8Path,
    ) -> Result<ShortcutEdit, ApplyError> {
        let io_error = |source| ApplyError::ShortcutIoFailure {
            path: path.to_path_buf(),
            source,
        };

        let bytes = fs::read(path).map_err(io_error)?;
        let content = String::from_utf8_lossy(&bytes);

        if !pattern.is_match(&content) {
            return Ok(ShortcutEdit::NotMatched);
        }

        match self.format.rewrite_bytes(&bytes, icon) {
            Some(updated) => {
                fs::write(path, updated).map_err(io_error)?;
                tracing::debug!("Updated shortcut icon: {}", path);
                Ok(ShortcutEdit::Updated)
            }
            None => Ok(ShortcutEdit::Unchanged),
        }
    }

    /// Update every matching shortcut for `app_id`; returns how many were written.
    ///
    /// Unreadable folders and per-file failures are logged and skipped, so the
    /// count always covers every folder that could be scanned.
    pub fn update_all(&self, app_id: u64, icon: &Utf8Path) -> Result<usize, ApplyError> {
        let pattern = launch_pattern(app_id)
            .map_err(|source| ApplyError::LaunchPattern { app_id, source })?;

        let mut updated = 0;
        for dir in &self.desktop_dirs {
            let entries = match dir.read_dir_utf8() {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!("Skipping desktop folder {}: {}", dir, e);
                    continue;
                }
            };

            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if !path.is_file()
                    || file_type_of(path).as_deref() != Some(self.format.extension())
                {
                    continue;
                }

                match self.update_file(path, &pattern, icon) {
                    Ok(ShortcutEdit::Updated) => updated += 1,
                    Ok(ShortcutEdit::Unchanged) => {
                        tracing::debug!("Shortcut already current: {}", path);
                    }
                    Ok(ShortcutEdit::NotMatched) => {}
                    Err(e) => tracing::warn!("Skipping shortcut: {}", e),
                }
            }
        }

        Ok(updated)
    }
}

fn platform_desktop_dirs() -> Vec<Utf8PathBuf> {
    let mut dirs_found = Vec::new();

    if let Some(desktop) = dirs::desktop_dir().and_then(|p| Utf8PathBuf::from_path_buf(p).ok()) {
        dirs_found.push(desktop);
    }

    if cfg!(target_os = "windows") {
        if let Ok(public) = std::env::var("PUBLIC") {
            let public_desktop = Utf8PathBuf::from(public).join("Desktop");
            if public_desktop.exists() {
                dirs_found.push(public_desktop);
            }
        }
    } else if let Some(data) = dirs::data_dir().and_then(|p| Utf8PathBuf::from_path_buf(p).ok()) {
        dirs_found.push(data.join("applications"));
    }

    dirs_found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ICON: &str = "/games/hl/valve/game.ico";

    #[test]
    fn test_url_inserts_icon_after_url_line() {
        let content = "[InternetShortcut]\nIDList=\nURL=steam://rungameid/70\nHotKey=0\n";
        let updated = ShortcutFormat::InternetShortcut
            .rewrite(content, Utf8Path::new(ICON))
            .unwrap();

        assert_eq!(
            updated,
            "[InternetShortcut]\nIDList=\nURL=steam://rungameid/70\nIconFile=/games/hl/valve/game.ico\nIconIndex=0\nHotKey=0\n"
        );
    }

    #[test]
    fn test_url_replaces_existing_icon_line() {
        let content = "[InternetShortcut]\r\nURL=steam://rungameid/70\r\nIconFile=C:\\old.ico\r\nIconIndex=0\r\n";
        let updated = ShortcutFormat::InternetShortcut
            .rewrite(content, Utf8Path::new(ICON))
            .unwrap();

        assert_eq!(
            updated,
            "[InternetShortcut]\r\nURL=steam://rungameid/70\r\nIconFile=/games/hl/valve/game.ico\r\nIconIndex=0\r\n"
        );
    }

    #[test]
    fn test_url_without_url_line_is_unchanged() {
        let content = "[InternetShortcut]\nIDList=\n";
        assert!(
            ShortcutFormat::InternetShortcut
                .rewrite(content, Utf8Path::new(ICON))
                .is_none()
        );
    }

    #[test]
    fn test_same_icon_is_unchanged() {
        let content = format!("URL=steam://rungameid/70\nIconFile={}\n", ICON);
        assert!(
            ShortcutFormat::InternetShortcut
                .rewrite(&content, Utf8Path::new(ICON))
                .is_none()
        );
    }

    #[test]
    fn test_desktop_inserts_icon_after_exec() {
        let content = "[Desktop Entry]\nName=Half-Life\nExec=steam steam://rungameid/70\nType=Application\n\n[Desktop Action Play]\nExec=steam\n";
        let updated = ShortcutFormat::DesktopEntry
            .rewrite(content, Utf8Path::new(ICON))
            .unwrap();

        assert_eq!(
            updated,
            "[Desktop Entry]\nName=Half-Life\nExec=steam steam://rungameid/70\nIcon=/games/hl/valve/game.ico\nType=Application\n\n[Desktop Action Play]\nExec=steam\n"
        );
    }

    #[test]
    fn test_desktop_replaces_icon_in_entry_section() {
        let content = "[Desktop Entry]\nIcon=steam_icon_70\nExec=steam steam://rungameid/70\n";
        let updated = ShortcutFormat::DesktopEntry
            .rewrite(content, Utf8Path::new(ICON))
            .unwrap();

        assert_eq!(
            updated,
            "[Desktop Entry]\nIcon=/games/hl/valve/game.ico\nExec=steam steam://rungameid/70\n"
        );
    }

    #[test]
    fn test_desktop_without_exec_appends_to_section() {
        let content = "[Desktop Entry]\nName=Half-Life\n[Other]\nKey=1";
        let updated = ShortcutFormat::DesktopEntry
            .rewrite(content, Utf8Path::new(ICON))
            .unwrap();

        assert_eq!(
            updated,
            "[Desktop Entry]\nName=Half-Life\nIcon=/games/hl/valve/game.ico\n[Other]\nKey=1"
        );
    }

    #[test]
    fn test_launch_pattern_variants() {
        let pattern = launch_pattern(70).unwrap();
        assert!(pattern.is_match("URL=steam://rungameid/70\n"));
        assert!(pattern.is_match("URL=steam://rungameid/70"));
        assert!(pattern.is_match("Exec=steam \"steam://run/70\""));
        assert!(!pattern.is_match("URL=steam://rungameid/700\n"));
        assert!(!pattern.is_match("URL=steam://rungameid/220\n"));
    }

    #[test]
    fn test_preferred_icon_per_format() {
        let mut applied = IndexMap::new();
        applied.insert("ico".to_string(), Utf8PathBuf::from("/t/game.ico"));
        applied.insert("jpg".to_string(), Utf8PathBuf::from("/t/game.jpg"));

        assert_eq!(
            ShortcutFormat::InternetShortcut.preferred_icon(&applied),
            Some(Utf8Path::new("/t/game.ico"))
        );
        assert_eq!(
            ShortcutFormat::DesktopEntry.preferred_icon(&applied),
            Some(Utf8Path::new("/t/game.jpg"))
        );

        applied.shift_remove("ico");
        assert_eq!(ShortcutFormat::InternetShortcut.preferred_icon(&applied), None);
    }

    #[test]
    fn test_update_all_counts_only_matching_files() {
        let dir = TempDir::new().unwrap();
        let desktop = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::write(desktop.join("Half-Life.url"), "[InternetShortcut]\nURL=steam://rungameid/70\n").unwrap();
        fs::write(desktop.join("Portal.url"), "[InternetShortcut]\nURL=steam://rungameid/400\n").unwrap();
        fs::write(desktop.join("notes.txt"), "steam://rungameid/70").unwrap();

        let updater = ShortcutUpdater::new(ShortcutFormat::InternetShortcut, vec![desktop.clone()]);
        let count = updater.update_all(70, Utf8Path::new(ICON)).unwrap();

        assert_eq!(count, 1);
        let hl = fs::read_to_string(desktop.join("Half-Life.url")).unwrap();
        assert!(hl.contains("IconFile=/games/hl/valve/game.ico\nIconIndex=0"));
        let portal = fs::read_to_string(desktop.join("Portal.url")).unwrap();
        assert!(!portal.contains("IconFile="));
        assert_eq!(fs::read_to_string(desktop.join("notes.txt")).unwrap(), "steam://rungameid/70");
    }

    #[test]
    fn test_update_file_classifies_unreadable_as_io_error() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let updater = ShortcutUpdater::new(ShortcutFormat::InternetShortcut, vec![]);
        let pattern = launch_pattern(70).unwrap();

        let result = updater.update_file(&root.join("missing.url"), &pattern, Utf8Path::new(ICON));
        assert!(matches!(result, Err(ApplyError::ShortcutIoFailure { .. })));
    }

    #[test]
    fn test_missing_desktop_dir_is_ignored() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let updater = ShortcutUpdater::new(ShortcutFormat::DesktopEntry, vec![root.join("Desktop")]);

        assert_eq!(updater.update_all(70, Utf8Path::new(ICON)).unwrap(), 0);
    }

    #[test]
    fn test_update_file_classifies_each_outcome() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let updater = ShortcutUpdater::new(ShortcutFormat::InternetShortcut, vec![]);
        let pattern = launch_pattern(70).unwrap();

        let other = root.join("Portal.url");
        fs::write(&other, "[InternetShortcut]\nURL=steam://rungameid/400\n").unwrap();
        assert_eq!(
            updater.update_file(&other, &pattern, Utf8Path::new(ICON)).unwrap(),
            ShortcutEdit::NotMatched
        );

        let current = root.join("Current.url");
        let current_content = format!("[InternetShortcut]\nURL=steam://rungameid/70\nIconFile={}\n", ICON);
        fs::write(&current, &current_content).unwrap();
        assert_eq!(
            updater.update_file(&current, &pattern, Utf8Path::new(ICON)).unwrap(),
            ShortcutEdit::Unchanged
        );
        assert_eq!(fs::read_to_string(&current).unwrap(), current_content);

        let stale = root.join("Stale.url");
        fs::write(&stale, "[InternetShortcut]\nURL=steam://rungameid/70\nIconFile=C:\\old.ico\n").unwrap();
        assert_eq!(
            updater.update_file(&stale, &pattern, Utf8Path::new(ICON)).unwrap(),
            ShortcutEdit::Updated
        );
        assert!(fs::read_to_string(&stale).unwrap().contains(&format!("IconFile={}", ICON)));
    }

    #[test]
    fn test_non_utf8_lines_survive_rewrite() {
        let dir = TempDir::new().unwrap();
        let desktop = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let shortcut = desktop.join("Half-Life.url");
        // Latin-1 "Café" as written by an ANSI code page
        fs::write(
            &shortcut,
            b"[InternetShortcut]\r\nURL=steam://rungameid/70\r\n; Caf\xE9\r\n".as_slice(),
        )
        .unwrap();

        let updater = ShortcutUpdater::new(ShortcutFormat::InternetShortcut, vec![desktop]);
        assert_eq!(updater.update_all(70, Utf8Path::new(ICON)).unwrap(), 1);

        let expected = format!(
            "[InternetShortcut]\r\nURL=steam://rungameid/70\r\nIconFile={}\r\nIconIndex=0\r\n",
            ICON
        );
        let mut expected = expected.into_bytes();
        expected.extend_from_slice(b"; Caf\xE9\r\n");
        assert_eq!(fs::read(&shortcut).unwrap(), expected);
    }

    #[test]
    fn test_rewrite_bytes_matches_text_rewrite() {
        let content = "[Desktop Entry]\nExec=steam steam://rungameid/70\nName=Half-Life\n";
        let text = ShortcutFormat::DesktopEntry
            .rewrite(content, Utf8Path::new(ICON))
            .unwrap();
        let bytes = ShortcutFormat::DesktopEntry
            .rewrite_bytes(content.as_bytes(), Utf8Path::new(ICON))
            .unwrap();
        assert_eq!(bytes, text.into_bytes());
    }

    #[test]
    fn test_unreadable_folder_does_not_stop_scan() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let first = root.join("Desktop");
        let second = root.join("Public");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("Half-Life.url"), "[InternetShortcut]\nURL=steam://rungameid/70\n").unwrap();
        fs::write(second.join("Half-Life.url"), "[InternetShortcut]\nURL=steam://run/70\n").unwrap();
        // A plain file listed as a folder fails to be read as a directory
        let not_a_dir = root.join("notes.txt");
        fs::write(&not_a_dir, "not a folder").unwrap();

        let updater = ShortcutUpdater::new(
            ShortcutFormat::InternetShortcut,
            vec![first, not_a_dir, second],
        );

        assert_eq!(updater.update_all(70, Utf8Path::new(ICON)).unwrap(), 2);
    }
}
