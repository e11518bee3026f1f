use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::models::{zeroize_forest, Credential, Node};
use crate::selection::{load_initial_selection, persist_selection, FileSelectionStore};
use crate::storage::{
    config_path, data_dir, ensure_dir, forest_path, load_config, load_config_from, save_config,
    selection_path, Config, ForestStorage, KeySource, KeyringKeySource, LoadSource,
};
use crate::store::ItemStore;
use crate::transfer::{
    auto_backup, default_export_path, export_encrypted, export_plaintext, import_file,
    ExportFormat, ImportError,
};
use crate::tree_view::{neighbour_id, visible_rows};
use crate::ui::{copy_value_to_clipboard, draw, mask, Focus, Overlay, Tone, ViewState};

const IDLE_TIMEOUT_SECS: u64 = 120;
const STATUS_MESSAGE_SECS: u64 = 2;
const TREE_NAV_HINT: &str = "↑/↓ move | →/← expand | n add | s add child | d delete | r rename | m move | Ctrl+S save | x export | i import | Tab details | Esc quit";
const DETAIL_NAV_HINT: &str = "↑/↓ select | a add | e name | v value | t description | h show | c copy | x remove | Tab/Esc tree";

pub fn run() -> Result<()> {
    let bin_name = executable_name();
    let mut args = std::env::args().skip(1);
    let mut export: Option<(ExportFormat, PathBuf)> = None;
    let mut backup_enabled: Option<bool> = None;
    let mut backup_dir: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("{bin_name} v{}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "-e" | "--export" => match args.next() {
                Some(p) => export = Some((ExportFormat::Encrypted, PathBuf::from(p))),
                None => return Err(anyhow!("--export requires a path")),
            },
            "-j" | "--export-json" => match args.next() {
                Some(p) => export = Some((ExportFormat::Plaintext, PathBuf::from(p))),
                None => return Err(anyhow!("--export-json requires a path")),
            },
            "--backup" => match args.next().as_deref() {
                Some("on") => backup_enabled = Some(true),
                Some("off") => backup_enabled = Some(false),
                _ => return Err(anyhow!("--backup expects 'on' or 'off'")),
            },
            "--backup-dir" => match args.next() {
                Some(p) => backup_dir = Some(PathBuf::from(p)),
                None => return Err(anyhow!("--backup-dir requires a path")),
            },
            "-h" | "--help" => {
                print_usage(&bin_name);
                return Ok(());
            }
            other => {
                print_usage(&bin_name);
                return Err(anyhow!("Unknown argument: {other}"));
            }
        }
    }

    if backup_enabled.is_some() || backup_dir.is_some() {
        let cfg = update_backup_settings(&config_path()?, backup_enabled, backup_dir)?;
        println!(
            "Auto backup {}{}",
            if cfg.backup_enabled { "on" } else { "off" },
            cfg.backup_path
                .as_ref()
                .map(|p| format!(", writing to {}", p.display()))
                .unwrap_or_default()
        );
        return Ok(());
    }

    let cfg = load_config()?;
    let dir = data_dir(&cfg)?;
    ensure_dir(&dir)?;
    let storage = ForestStorage::new(forest_path(&dir), KeyringKeySource);
    let mut loaded = storage.read_forest();

    if let Some((format, path)) = export {
        if loaded.source == LoadSource::Sample {
            if let Some(notice) = &loaded.notice {
                eprintln!("{notice}");
            }
        }
        let result = export_forest(&storage, &loaded.forest, format, &path);
        zeroize_forest(&mut loaded.forest);
        result?;
        println!("Exported to {}", path.display());
        return Ok(());
    }

    let backup_notice = run_auto_backup(&cfg, &dir, &storage, &loaded.forest);

    let slots = FileSelectionStore::new(selection_path(&dir));
    let initial = load_initial_selection(&slots);
    let mut items = ItemStore::new(
        loaded.forest,
        initial.selected_id.as_deref(),
        initial.expanded_ids,
    );
    persist_selection(&mut items, slots);

    let mut session = Session::new(items, storage, cfg, dir);
    if let Some(notice) = loaded.notice.take().or(backup_notice) {
        session.flash(notice);
    }

    let result = run_tui(&mut session);
    session.items.wipe();
    result
}

fn update_backup_settings(
    path: &Path,
    enabled: Option<bool>,
    dir: Option<PathBuf>,
) -> Result<Config> {
    let mut cfg = load_config_from(path)?;
    if let Some(enabled) = enabled {
        cfg.backup_enabled = enabled;
    }
    if let Some(dir) = dir {
        if !dir.is_dir() {
            return Err(anyhow!("Backup directory {} does not exist", dir.display()));
        }
        cfg.backup_path = Some(dir);
    }
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    save_config(path, &cfg)?;
    info!(enabled = cfg.backup_enabled, path = ?cfg.backup_path, "backup settings updated");
    Ok(cfg)
}

fn export_forest<K: KeySource>(
    storage: &ForestStorage<K>,
    forest: &[Node],
    format: ExportFormat,
    path: &Path,
) -> Result<()> {
    match format {
        ExportFormat::Encrypted => {
            let key = storage.keys().load_or_create_key()?;
            export_encrypted(path, forest, &key)
        }
        ExportFormat::Plaintext => export_plaintext(path, forest),
    }
}

/// Startup backup. Failures are reported but never stop the app.
fn run_auto_backup<K: KeySource>(
    cfg: &Config,
    dir: &Path,
    storage: &ForestStorage<K>,
    forest: &[Node],
) -> Option<String> {
    if !cfg.backup_enabled {
        return None;
    }
    let result = storage
        .keys()
        .load_or_create_key()
        .and_then(|key| auto_backup(cfg, dir, forest, &key, Local::now()));
    match result {
        Ok(Some(path)) => {
            info!(path = %path.display(), "auto backup written");
            None
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "auto backup failed");
            Some(format!("Auto backup failed: {e}"))
        }
    }
}

fn run_tui<K: KeySource>(session: &mut Session<K>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut last_activity = Instant::now();

    let result = (|| -> Result<()> {
        loop {
            session.expire_status();

            if last_activity.elapsed() >= Duration::from_secs(IDLE_TIMEOUT_SECS) {
                session.status = "Idle timeout reached. Exiting...".to_string();
                terminal.draw(|f| session.render(f))?;
                info!("idle timeout reached");
                break;
            }

            terminal.draw(|f| session.render(f))?;

            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key_event) = event::read()? {
                    if key_event.kind != KeyEventKind::Press {
                        continue;
                    }
                    last_activity = Instant::now();
                    session.handle_key(key_event);
                    if session.quit {
                        break;
                    }
                }
            }
        }
        Ok(())
    })();

    teardown_terminal(&mut terminal);
    result
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) {
    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        crossterm::cursor::Show
    )
    .ok();
    terminal.show_cursor().ok();
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PromptTarget {
    Rename(String),
    CredentialName(usize),
    CredentialValue(usize),
    CredentialDescription(usize),
    ImportPath,
    ExportPath(ExportFormat),
}

struct PromptForm {
    target: PromptTarget,
    input: String,
    masked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Confirm {
    Delete { id: String, title: String },
    Save,
    Import,
    Quit,
}

enum Modal {
    Prompt(PromptForm),
    Confirm(Confirm),
    ExportChoice,
}

struct Session<K: KeySource> {
    items: ItemStore,
    storage: ForestStorage<K>,
    cfg: Config,
    data_dir: PathBuf,
    focus: Focus,
    credential_idx: usize,
    moving: Option<String>,
    modal: Option<Modal>,
    status: String,
    status_until: Option<Instant>,
    quit: bool,
}

impl<K: KeySource> Session<K> {
    fn new(items: ItemStore, storage: ForestStorage<K>, cfg: Config, data_dir: PathBuf) -> Self {
        let mut session = Self {
            items,
            storage,
            cfg,
            data_dir,
            focus: Focus::Tree,
            credential_idx: 0,
            moving: None,
            modal: None,
            status: TREE_NAV_HINT.to_string(),
            status_until: None,
            quit: false,
        };
        session.reveal_active();
        session
    }

    /// Expands every collapsed ancestor so the active node has a row.
    fn reveal_active(&mut self) {
        let Some(mut id) = self.items.active_id().map(str::to_string) else {
            return;
        };
        while let Some(parent) = self.items.parent_id(&id).map(str::to_string) {
            self.items.set_expanded(&parent, true);
            id = parent;
        }
    }

    fn hint(&self) -> &'static str {
        match self.focus {
            Focus::Tree => TREE_NAV_HINT,
            Focus::Detail => DETAIL_NAV_HINT,
        }
    }

    fn flash(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.status_until = Some(Instant::now() + Duration::from_secs(STATUS_MESSAGE_SECS));
    }

    fn expire_status(&mut self) {
        if let Some(until) = self.status_until {
            if Instant::now() >= until {
                self.status = self.hint().to_string();
                self.status_until = None;
            }
        }
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.status = self.hint().to_string();
        self.status_until = None;
    }

    fn render(&self, f: &mut ratatui::Frame<'_>) {
        let rows = visible_rows(self.items.staging(), self.items.expanded_ids());
        let moving_title = self
            .moving
            .as_deref()
            .and_then(|id| self.items.find(id))
            .map(|node| node.data.title.as_str());
        let view = ViewState {
            rows: &rows,
            active: self.items.active(),
            moving_title,
            focus: self.focus,
            credential_idx: self.credential_idx,
            dirty: self.items.has_unsaved_changes(),
            overlay: self.modal.as_ref().map(|modal| self.overlay(modal)),
            status: self.status.clone(),
        };
        draw(f, &view);
    }

    fn overlay(&self, modal: &Modal) -> Overlay {
        match modal {
            Modal::Prompt(form) => {
                let (label, title, tone) = match &form.target {
                    PromptTarget::Rename(_) => ("Title", "Rename item", Tone::Edit),
                    PromptTarget::CredentialName(_) => ("Name", "Edit credential", Tone::Edit),
                    PromptTarget::CredentialValue(_) => ("Value", "Edit credential", Tone::Edit),
                    PromptTarget::CredentialDescription(_) => {
                        ("Description", "Edit credential", Tone::Edit)
                    }
                    PromptTarget::ImportPath => ("File to import", "Import", Tone::Transfer),
                    PromptTarget::ExportPath(_) => ("Export to", "Export", Tone::Transfer),
                };
                let shown = if form.masked {
                    mask(&form.input)
                } else {
                    form.input.clone()
                };
                Overlay {
                    title,
                    tone,
                    lines: vec![
                        format!("{label}: {shown}_"),
                        String::new(),
                        "Enter to confirm, Esc to cancel".to_string(),
                    ],
                }
            }
            Modal::Confirm(confirm) => {
                let (question, title, tone) = match confirm {
                    Confirm::Delete { title, .. } => (
                        format!("Delete '{title}' and everything under it?"),
                        "Confirm delete",
                        Tone::Caution,
                    ),
                    Confirm::Save => (
                        "Save the current items?".to_string(),
                        "Confirm save",
                        Tone::Edit,
                    ),
                    Confirm::Import => (
                        "Replace the current items with an imported file?".to_string(),
                        "Import",
                        Tone::Caution,
                    ),
                    Confirm::Quit if self.items.has_unsaved_changes() => (
                        "Unsaved changes will be lost. Quit?".to_string(),
                        "Confirm quit",
                        Tone::Caution,
                    ),
                    Confirm::Quit => ("Quit?".to_string(), "Confirm quit", Tone::Edit),
                };
                Overlay {
                    title,
                    tone,
                    lines: vec![question, String::new(), "[y] Yes   [n] No".to_string()],
                }
            }
            Modal::ExportChoice => Overlay {
                title: "Export",
                tone: Tone::Transfer,
                lines: vec![
                    "Encrypt the exported file?".to_string(),
                    String::new(),
                    "[e] Encrypted   [p] Plain JSON   [Esc] Cancel".to_string(),
                ],
            },
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match self.modal.take() {
            Some(Modal::Prompt(form)) => self.handle_prompt_modal(key.code, form),
            Some(Modal::Confirm(confirm)) => self.handle_confirm_modal(key.code, confirm),
            Some(Modal::ExportChoice) => self.handle_export_modal(key.code),
            None if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if matches!(key.code, KeyCode::Char('s') | KeyCode::Char('S')) {
                    self.modal = Some(Modal::Confirm(Confirm::Save));
                }
            }
            None => match self.focus {
                Focus::Tree => self.handle_tree_key(key.code),
                Focus::Detail => self.handle_detail_key(key.code),
            },
        }
    }

    fn handle_tree_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Down => {
                let offset = if key == KeyCode::Up { -1 } else { 1 };
                let next = {
                    let rows = visible_rows(self.items.staging(), self.items.expanded_ids());
                    neighbour_id(&rows, self.items.active_id(), offset)
                };
                if let Some(id) = next {
                    self.items.switch_active_node(&id);
                    self.credential_idx = 0;
                }
            }
            KeyCode::Right => {
                if let Some(active) = self.items.active().filter(|n| n.has_children()) {
                    let id = active.id.clone();
                    self.items.set_expanded(&id, true);
                }
            }
            KeyCode::Left => {
                let Some(id) = self.items.active_id().map(str::to_string) else {
                    return;
                };
                if self.items.is_expanded(&id) {
                    self.items.set_expanded(&id, false);
                } else if let Some(parent) = self.items.parent_id(&id).map(str::to_string) {
                    self.items.switch_active_node(&parent);
                    self.credential_idx = 0;
                }
            }
            KeyCode::Char('n') => {
                self.items.add_new_top_item();
                self.credential_idx = 0;
                let title = self.active_title();
                self.flash(format!("Added {title}"));
            }
            KeyCode::Char('s') => {
                let Some(parent) = self.items.active_id().map(str::to_string) else {
                    self.flash("Select an item first");
                    return;
                };
                if self.items.add_new_sub_item_by_id(&parent).is_some() {
                    self.items.set_expanded(&parent, true);
                    self.credential_idx = 0;
                    let title = self.active_title();
                    self.flash(format!("Added {title}"));
                }
            }
            KeyCode::Char('d') => {
                if let Some(active) = self.items.active() {
                    self.modal = Some(Modal::Confirm(Confirm::Delete {
                        id: active.id.clone(),
                        title: active.data.title.clone(),
                    }));
                }
            }
            KeyCode::Char('r') => {
                if let Some(active) = self.items.active() {
                    self.modal = Some(Modal::Prompt(PromptForm {
                        target: PromptTarget::Rename(active.id.clone()),
                        input: active.data.title.clone(),
                        masked: false,
                    }));
                }
            }
            KeyCode::Char('m') => self.move_marked(false),
            KeyCode::Char('M') => self.move_marked(true),
            KeyCode::Char('x') => self.modal = Some(Modal::ExportChoice),
            KeyCode::Char('i') => self.modal = Some(Modal::Confirm(Confirm::Import)),
            KeyCode::Tab => {
                if self.items.active().is_some() {
                    self.credential_idx = 0;
                    self.set_focus(Focus::Detail);
                }
            }
            KeyCode::Esc => {
                if self.moving.take().is_some() {
                    self.flash("Move cancelled");
                } else {
                    self.modal = Some(Modal::Confirm(Confirm::Quit));
                }
            }
            _ => {}
        }
    }

    fn move_marked(&mut self, to_root: bool) {
        let Some(active_id) = self.items.active_id().map(str::to_string) else {
            return;
        };
        let Some(source) = self.moving.take() else {
            if !to_root {
                self.moving = Some(active_id);
            }
            return;
        };

        if to_root {
            if self.items.move_item(&source, None) {
                self.flash("Moved to the top level");
            }
            return;
        }
        if source == active_id {
            self.flash("Move cancelled");
            return;
        }
        if self.items.move_item(&source, Some(&active_id)) {
            self.items.set_expanded(&active_id, true);
            self.flash("Item moved");
        } else {
            self.flash("An item cannot be moved under itself");
        }
    }

    fn handle_detail_key(&mut self, key: KeyCode) {
        let count = self.credential_count();
        let idx = self.credential_idx.min(count.saturating_sub(1));
        match key {
            KeyCode::Tab | KeyCode::Esc => self.set_focus(Focus::Tree),
            KeyCode::Up => self.credential_idx = idx.saturating_sub(1),
            KeyCode::Down => self.credential_idx = (idx + 1).min(count.saturating_sub(1)),
            KeyCode::Char('a') => {
                if self
                    .items
                    .edit_active(|data| data.credentials.push(Credential::default()))
                {
                    self.credential_idx = count;
                    self.modal = Some(Modal::Prompt(PromptForm {
                        target: PromptTarget::CredentialName(count),
                        input: String::new(),
                        masked: false,
                    }));
                }
            }
            KeyCode::Char('e') | KeyCode::Char('v') | KeyCode::Char('t') if count > 0 => {
                let Some(credential) = self.selected_credential() else {
                    return;
                };
                let form = match key {
                    KeyCode::Char('e') => PromptForm {
                        target: PromptTarget::CredentialName(idx),
                        input: credential.name.clone(),
                        masked: false,
                    },
                    KeyCode::Char('v') => PromptForm {
                        target: PromptTarget::CredentialValue(idx),
                        input: credential.value.clone(),
                        masked: !credential.show_value,
                    },
                    _ => PromptForm {
                        target: PromptTarget::CredentialDescription(idx),
                        input: credential.description.clone().unwrap_or_default(),
                        masked: false,
                    },
                };
                self.modal = Some(Modal::Prompt(form));
            }
            KeyCode::Char('h') if count > 0 => {
                self.items.edit_active(|data| {
                    if let Some(c) = data.credentials.get_mut(idx) {
                        c.show_value = !c.show_value;
                    }
                });
            }
            KeyCode::Char('c') => match self.selected_credential() {
                Some(credential) => match copy_value_to_clipboard(credential) {
                    Ok(()) => {
                        let name = credential.name.clone();
                        self.flash(format!("Copied '{name}' to clipboard for 20s"));
                    }
                    Err(e) => self.flash(format!("Clipboard error: {e}")),
                },
                None => self.flash("No credential selected"),
            },
            KeyCode::Char('x') if count > 0 => {
                self.items.edit_active(|data| {
                    if idx < data.credentials.len() {
                        let mut removed = data.credentials.remove(idx);
                        removed.zeroize();
                    }
                });
                self.credential_idx = idx.saturating_sub(1);
                self.flash("Credential removed");
            }
            _ => {}
        }
    }

    fn handle_prompt_modal(&mut self, key: KeyCode, mut form: PromptForm) {
        match key {
            KeyCode::Esc => {
                form.input.zeroize();
                self.flash("Cancelled");
            }
            KeyCode::Enter => self.apply_prompt(form),
            KeyCode::Backspace => {
                form.input.pop();
                self.modal = Some(Modal::Prompt(form));
            }
            KeyCode::Char(c) => {
                form.input.push(c);
                self.modal = Some(Modal::Prompt(form));
            }
            _ => self.modal = Some(Modal::Prompt(form)),
        }
    }

    fn apply_prompt(&mut self, form: PromptForm) {
        let PromptForm {
            target,
            mut input,
            masked,
        } = form;
        match target {
            PromptTarget::Rename(id) => {
                let title = input.trim().to_string();
                if title.is_empty() {
                    self.flash("Title cannot be empty");
                    self.modal = Some(Modal::Prompt(PromptForm {
                        target: PromptTarget::Rename(id),
                        input,
                        masked,
                    }));
                    return;
                }
                if self.items.rename_item(&id, &title) {
                    self.flash(format!("Renamed to {title}"));
                }
            }
            PromptTarget::CredentialName(idx) => {
                let name = input.trim().to_string();
                self.edit_credential(idx, |c| c.name = name);
            }
            PromptTarget::CredentialValue(idx) => {
                let value = input.clone();
                self.edit_credential(idx, |c| {
                    c.value.zeroize();
                    c.value = value;
                });
            }
            PromptTarget::CredentialDescription(idx) => {
                let text = input.trim();
                let description = (!text.is_empty()).then(|| text.to_string());
                self.edit_credential(idx, |c| c.description = description);
            }
            PromptTarget::ImportPath => {
                let path = PathBuf::from(input.trim());
                self.import_from(&path);
            }
            PromptTarget::ExportPath(format) => {
                let path = PathBuf::from(input.trim());
                self.export_to(format, &path);
            }
        }
        input.zeroize();
    }

    fn edit_credential<F>(&mut self, idx: usize, edit: F)
    where
        F: FnOnce(&mut Credential),
    {
        self.items.edit_active(|data| {
            if let Some(credential) = data.credentials.get_mut(idx) {
                edit(credential);
            }
        });
    }

    fn handle_confirm_modal(&mut self, key: KeyCode, confirm: Confirm) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => match confirm {
                Confirm::Delete { id, title } => {
                    if self.items.remove_item_and_children(&id) {
                        self.credential_idx = 0;
                        if self.moving.as_deref().is_some_and(|m| self.items.find(m).is_none()) {
                            self.moving = None;
                        }
                        self.flash(format!("Deleted {title}"));
                    }
                }
                Confirm::Save => self.save(),
                Confirm::Import => {
                    self.modal = Some(Modal::Prompt(PromptForm {
                        target: PromptTarget::ImportPath,
                        input: String::new(),
                        masked: false,
                    }));
                }
                Confirm::Quit => self.quit = true,
            },
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.flash("Cancelled"),
            _ => self.modal = Some(Modal::Confirm(confirm)),
        }
    }

    fn handle_export_modal(&mut self, key: KeyCode) {
        let format = match key {
            KeyCode::Char('e') => ExportFormat::Encrypted,
            KeyCode::Char('p') => ExportFormat::Plaintext,
            KeyCode::Esc => {
                self.flash("Export cancelled");
                return;
            }
            _ => {
                self.modal = Some(Modal::ExportChoice);
                return;
            }
        };
        let path = default_export_path(&self.cfg, &self.data_dir, format, Local::now());
        self.modal = Some(Modal::Prompt(PromptForm {
            target: PromptTarget::ExportPath(format),
            input: path.display().to_string(),
            masked: false,
        }));
    }

    fn save(&mut self) {
        if !self.items.has_unsaved_changes() {
            self.flash("Nothing to save");
            return;
        }
        match self.storage.write_forest(self.items.staging()) {
            Ok(()) => {
                self.items.commit();
                self.flash("Saved");
            }
            Err(e) => {
                warn!(error = %e, "save failed");
                self.flash(format!("Save failed: {e}"));
            }
        }
    }

    fn import_from(&mut self, path: &Path) {
        if path.as_os_str().is_empty() {
            self.flash("No file given");
            return;
        }
        let key = match self.storage.keys().load_key() {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "storage key unavailable for import");
                None
            }
        };
        match import_file(path, key.as_ref()) {
            Ok(forest) => {
                let roots = forest.len();
                self.items.replace_staging(forest);
                self.refocus_after_import();
                self.flash(format!("Imported {roots} items. Ctrl+S saves them."));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "import failed");
                self.flash(import_failure_message(&e));
            }
        }
    }

    fn refocus_after_import(&mut self) {
        let target = self
            .items
            .active_id()
            .filter(|id| self.items.find(id).is_some())
            .or_else(|| self.items.staging().first().map(|node| node.id.as_str()))
            .map(str::to_string);
        match target {
            Some(id) => {
                self.items.switch_active_node(&id);
            }
            None => self.items.update_active_node(None),
        }
        self.reveal_active();
        self.moving = None;
        self.credential_idx = 0;
    }

    fn export_to(&mut self, format: ExportFormat, path: &Path) {
        if path.as_os_str().is_empty() {
            self.flash("No file given");
            return;
        }
        match export_forest(&self.storage, self.items.staging(), format, path) {
            Ok(()) => self.flash(format!("Exported to {}", path.display())),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "export failed");
                self.flash(format!("Export failed: {e}"));
            }
        }
    }

    fn credential_count(&self) -> usize {
        self.items
            .active()
            .map_or(0, |node| node.data.credentials.len())
    }

    fn selected_credential(&self) -> Option<&Credential> {
        let credentials = &self.items.active()?.data.credentials;
        credentials.get(self.credential_idx.min(credentials.len().checked_sub(1)?))
    }

    fn active_title(&self) -> String {
        self.items
            .active()
            .map(|node| node.data.title.clone())
            .unwrap_or_default()
    }
}

fn import_failure_message(e: &ImportError) -> String {
    match e {
        ImportError::Syntax { line, column } => {
            format!("Import failed: the file is not valid JSON (line {line}, column {column})")
        }
        other => format!("Import failed: {other}"),
    }
}

fn print_usage(bin_name: &str) {
    eprintln!("Usage: {bin_name} [OPTIONS]");
    eprintln!("  (no options)             Open the item tree UI");
    eprintln!("  -e, --export <PATH>      Write an encrypted export of the saved items");
    eprintln!("  -j, --export-json <PATH> Write a plain JSON export of the saved items");
    eprintln!("      --backup <on|off>    Turn the startup backup on or off");
    eprintln!("      --backup-dir <PATH>  Directory for backups and default exports");
    eprintln!("  -V, --version            Show version and exit");
    eprintln!("  -h, --help               Show this help");
}

fn executable_name() -> String {
    let fallback = "aegis".to_string();
    let arg0 = match std::env::args().next() {
        Some(v) => v,
        None => return fallback,
    };
    let path = Path::new(&arg0);
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => fallback,
    }
}
