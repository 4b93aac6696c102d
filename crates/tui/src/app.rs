use std::{io, thread, time::Duration};

use anyhow::{anyhow, Context, Result};
use consist_core::{
    account::{AccountEvent, AccountStore, CardSource, Roster},
    config::AppConfig,
    drawer::{
        CardGroup, CommitOutcome, ConfirmOutcome, Drawer, DrawerEvent, DrawerState, EquipStatus,
        GroupKey, HypotheticalPreview, InventoryFilter, RenderMode, StateKind,
    },
    models::{CardKind, TrainStats},
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::{
    broadcast::{self, error::TryRecvError},
    mpsc,
};
use tracing::{debug, error, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const FADE_TICKS: u8 = 2;

#[derive(Debug, Clone)]
struct Theme {
    accent: Color,
    muted: Color,
    selection_bg: Color,
    selection_fg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Terminal front-end driving the card drawer.
pub struct ConsistApp {
    drawer: Drawer<Roster, AccountStore>,
    roster: Roster,
    drawer_rx: broadcast::Receiver<DrawerEvent>,
    account_rx: Option<mpsc::Receiver<AccountEvent>>,
    default_train: Option<String>,
    animate: bool,
    trains: ListState,
    active_group: usize,
    last_kind: StateKind,
    preview: Option<HypotheticalPreview>,
    fade_ticks: u8,
    pending_show: bool,
    status: String,
    status_level: StatusLevel,
    should_quit: bool,
    theme: Theme,
}

impl ConsistApp {
    pub fn new(roster: Roster, store: AccountStore, config: &AppConfig) -> Self {
        let drawer = Drawer::new(roster.clone(), store).with_animation(config.animate);
        let drawer_rx = drawer.subscribe();
        let mut trains = ListState::default();
        let names: Vec<String> = roster.trains().into_iter().map(|train| train.name).collect();
        let selected = config
            .default_train
            .as_ref()
            .and_then(|wanted| names.iter().position(|name| name == wanted))
            .unwrap_or(0);
        if !names.is_empty() {
            trains.select(Some(selected));
        }
        Self {
            drawer,
            roster,
            drawer_rx,
            account_rx: None,
            default_train: config.default_train.clone(),
            animate: config.animate,
            trains,
            active_group: 0,
            last_kind: StateKind::Closed,
            preview: None,
            fade_ticks: 0,
            pending_show: false,
            status: String::new(),
            status_level: StatusLevel::Info,
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let trains = self.roster.trains().len();
        self.set_status(
            format!("Loaded {trains} trains for {}", self.roster.player()),
            StatusLevel::Info,
        );
        if let Some(train) = self.default_train.clone() {
            if let Err(err) = self.drawer.open_composition(&train) {
                error!(%train, "Opening default train failed: {err}");
                self.set_status(format!("Cannot open {train}: {err}"), StatusLevel::Error);
            }
        }
        self.drain_drawer_events();

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let mut account_rx = self.account_rx.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            if let Some(rx) = account_rx.as_mut() {
                let mut watch_closed = false;
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event).await {
                            break;
                        }
                    }
                    maybe_account = rx.recv() => {
                        match maybe_account {
                            Some(event) => self.handle_account_event(event),
                            None => watch_closed = true,
                        }
                    }
                }
                if watch_closed {
                    account_rx = None;
                }
            } else {
                let maybe_event = event_rx.recv().await;
                if !self.process_app_event(maybe_event).await {
                    break;
                }
            }
            self.drain_drawer_events();

            if self.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        Ok(())
    }

    pub fn attach_watcher(&mut self, receiver: mpsc::Receiver<AccountEvent>) {
        self.account_rx = Some(receiver);
    }

    async fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if let Err(err) = self.handle_key(key).await {
                    warn!("Drawer action failed: {err}");
                    self.set_status(format!("Error: {err}"), StatusLevel::Error);
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.fade_ticks = self.fade_ticks.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    fn handle_account_event(&mut self, event: AccountEvent) {
        match event {
            AccountEvent::Reloaded { path, snapshot } => {
                if let Err(err) = self.roster.refresh(snapshot) {
                    error!(?err, "Reloaded account is inconsistent");
                    self.set_status(format!("Account reload failed: {err}"), StatusLevel::Error);
                    return;
                }
                info!(path = %path.display(), "Account reloaded");
                if self.drawer.state() != &DrawerState::Closed {
                    if let Err(err) = self.drawer.refresh(RenderMode::CrossFade) {
                        error!(?err, "Refreshing drawer after reload failed");
                        if let Err(err) = self.drawer.close() {
                            error!(?err, "Closing drawer failed");
                        }
                    }
                }
                self.clamp_train_cursor();
                self.set_status("Account refreshed".to_string(), StatusLevel::Info);
            }
            AccountEvent::Error(err) => {
                error!(?err, "Account watcher failed");
                self.set_status(format!("Account reload failed: {err}"), StatusLevel::Error);
            }
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        let closed = self.drawer.state() == &DrawerState::Closed;
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc if closed => self.should_quit = true,
            KeyCode::Esc => {
                let discarded = self.drawer.has_unsaved_diff();
                self.drawer.close()?;
                if discarded {
                    self.set_status("Edits discarded".to_string(), StatusLevel::Warning);
                }
            }
            KeyCode::Char('i') => self.drawer.open_inventory()?,
            KeyCode::Char('o') => {
                let train = self.selected_train()?;
                self.drawer.open_composition(train)?;
            }
            KeyCode::Char('l') => {
                let train = self.selected_train()?;
                self.drawer.open_loadout(train)?;
            }
            KeyCode::Char('c') => self.confirm().await?,
            KeyCode::Char('f') => self.cycle_kind_filter()?,
            KeyCode::Char('a') => self.cycle_status_filter()?,
            KeyCode::Char('r') => self.drawer.rebuild(self.animate)?,
            KeyCode::Up if closed => self.move_train_cursor(-1),
            KeyCode::Down if closed => self.move_train_cursor(1),
            KeyCode::Tab | KeyCode::Down => self.cycle_group(1)?,
            KeyCode::BackTab | KeyCode::Up => self.cycle_group(-1)?,
            KeyCode::Right => self.move_focus(true)?,
            KeyCode::Left => self.move_focus(false)?,
            KeyCode::Enter => self.activate_focused()?,
            _ => {}
        }
        Ok(())
    }

    async fn confirm(&mut self) -> Result<()> {
        match self.drawer.confirm().await? {
            ConfirmOutcome::Ignored => {
                self.set_status("Nothing to confirm here".to_string(), StatusLevel::Info)
            }
            ConfirmOutcome::Returned(kind) => debug!(?kind, "Returned to overview"),
            ConfirmOutcome::Commit(CommitOutcome::Unchanged) => {
                self.set_status("No changes to save".to_string(), StatusLevel::Info)
            }
            // Reported through drawer events.
            ConfirmOutcome::Commit(_) => {}
        }
        Ok(())
    }

    fn active_key(&self) -> Option<GroupKey> {
        self.drawer
            .groups()
            .get(self.active_group)
            .map(|group| group.key)
    }

    fn cycle_group(&mut self, delta: isize) -> Result<()> {
        let count = self.drawer.groups().len();
        if count == 0 {
            return Ok(());
        }
        self.active_group = (self.active_group as isize + delta).rem_euclid(count as isize) as usize;
        self.hover_focused()
    }

    fn move_focus(&mut self, forward: bool) -> Result<()> {
        let Some(key) = self.active_key() else {
            return Ok(());
        };
        if let Some(group) = self.drawer.group_mut(key) {
            let index = if forward {
                group.focus.next()
            } else {
                group.focus.prev()
            };
            group.focus.set_animated_index(index as f64);
        }
        self.hover_focused()
    }

    fn hover_focused(&mut self) -> Result<()> {
        let Some(key) = self.active_key() else {
            return Ok(());
        };
        let index = self
            .drawer
            .group(key)
            .filter(|group| !group.is_empty())
            .map(|group| group.focus.index());
        self.drawer.hover(key, index)?;
        Ok(())
    }

    fn activate_focused(&mut self) -> Result<()> {
        let Some(key) = self.active_key() else {
            return Ok(());
        };
        let index = match self.drawer.state() {
            DrawerState::CompositionOverview { .. } => None,
            _ => self
                .drawer
                .group(key)
                .filter(|group| !group.is_empty())
                .map(|group| group.focus.index()),
        };
        self.drawer.activate(key, index)?;
        Ok(())
    }

    fn cycle_kind_filter(&mut self) -> Result<()> {
        let filter = self.drawer.filter();
        let next = match filter.kind {
            None => CardKind::ALL.first().copied(),
            Some(kind) => CardKind::ALL
                .iter()
                .position(|candidate| *candidate == kind)
                .and_then(|index| CardKind::ALL.get(index + 1))
                .copied(),
        };
        self.drawer.set_filter(InventoryFilter { kind: next, ..filter })?;
        Ok(())
    }

    fn cycle_status_filter(&mut self) -> Result<()> {
        let filter = self.drawer.filter();
        let next = match filter.status {
            None => Some(EquipStatus::Available),
            Some(EquipStatus::Available) => Some(EquipStatus::Equipped),
            Some(EquipStatus::Equipped) => None,
        };
        self.drawer.set_filter(InventoryFilter {
            status: next,
            ..filter
        })?;
        Ok(())
    }

    fn selected_train(&self) -> Result<String> {
        let index = self
            .trains
            .selected()
            .ok_or_else(|| anyhow!("No train selected"))?;
        self.roster
            .trains()
            .into_iter()
            .nth(index)
            .map(|train| train.name)
            .ok_or_else(|| anyhow!("No train selected"))
    }

    fn move_train_cursor(&mut self, delta: isize) {
        let count = self.roster.trains().len();
        if count == 0 {
            self.trains.select(None);
            return;
        }
        let current = self.trains.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, count as isize - 1) as usize;
        self.trains.select(Some(next));
    }

    fn clamp_train_cursor(&mut self) {
        self.move_train_cursor(0);
    }

    fn drain_drawer_events(&mut self) {
        loop {
            match self.drawer_rx.try_recv() {
                Ok(event) => self.handle_drawer_event(event),
                Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "Drawer events dropped"),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if self.pending_show {
            self.drawer.pool().show_all();
            self.pending_show = false;
        }
    }

    fn handle_drawer_event(&mut self, event: DrawerEvent) {
        match event {
            DrawerEvent::StateChanged(kind) => {
                self.select_group_after_transition(kind);
                self.last_kind = kind;
            }
            DrawerEvent::Hypothetical(preview) => self.preview = preview,
            DrawerEvent::Render(RenderMode::Immediate) => self.pending_show = true,
            DrawerEvent::Render(RenderMode::CrossFade) => self.fade_ticks = FADE_TICKS,
            DrawerEvent::Render(RenderMode::Skip) => {}
            DrawerEvent::Warning(message) => self.set_status(message, StatusLevel::Warning),
            DrawerEvent::Committed { train } => {
                self.set_status(format!("Saved {train}"), StatusLevel::Success)
            }
        }
    }

    fn select_group_after_transition(&mut self, kind: StateKind) {
        let groups = self.drawer.groups();
        let position = |key: GroupKey| groups.iter().position(|group| group.key == key);

        if let DrawerState::ChangeCommodities {
            resume_focus: Some(resume),
            ..
        } = self.drawer.state()
        {
            if let Some(index) = position(resume.group) {
                self.active_group = index;
                return;
            }
        }
        if kind != self.last_kind {
            self.active_group = position(GroupKey::Unequipped).unwrap_or(0);
        } else if self.active_group >= groups.len() {
            self.active_group = groups.len().saturating_sub(1);
        }
    }

    fn set_status(&mut self, message: String, level: StatusLevel) {
        self.status = message;
        self.status_level = level;
    }

    fn draw(&mut self, frame: &mut Frame) {
        let preview_height = if self.preview.is_some() { 4 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(preview_height),
                Constraint::Length(4),
            ])
            .split(frame.size());

        self.render_header(frame, chunks[0]);
        if self.drawer.state() == &DrawerState::Closed {
            self.render_trains(frame, chunks[1]);
        } else {
            self.render_groups(frame, chunks[1]);
        }
        if let Some(preview) = &self.preview {
            self.render_preview(frame, chunks[2], preview);
        }
        self.render_status(frame, chunks[3]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(
                self.drawer.state().title(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  ·  {}", self.roster.player())),
            Span::styled(
                format!("  ·  loaded {}", self.roster.loaded_at().format("%H:%M:%S")),
                Style::default().fg(self.theme.muted),
            ),
        ];
        if self.drawer.has_unsaved_diff() {
            spans.push(Span::styled(
                "  ● unsaved changes",
                Style::default().fg(self.theme.warning),
            ));
        }
        if self.drawer.state() == &DrawerState::Inventory {
            spans.push(Span::styled(
                format!("  {}", describe_filter(&self.drawer.filter())),
                Style::default().fg(self.theme.muted),
            ));
        }
        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Consist"));
        frame.render_widget(paragraph, area);
    }

    fn render_trains(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .roster
            .trains()
            .iter()
            .map(|train| {
                let stats = train.stats();
                let conductor = train
                    .conductor
                    .as_ref()
                    .map(|card| card.name.clone())
                    .unwrap_or_else(|| "no conductor".to_string());
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<16}", train.name),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!(
                        " {}/{} cars  weight {}/{}  ",
                        stats.car_count, stats.slot_count, stats.total_weight, stats.max_weight
                    )),
                    Span::styled(conductor, Style::default().fg(self.theme.muted)),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Trains"))
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.selection_fg),
            )
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, area, &mut self.trains);
    }

    fn render_groups(&self, frame: &mut Frame, area: Rect) {
        let groups = self.drawer.groups();
        if groups.is_empty() {
            return;
        }
        let constraints: Vec<Constraint> = groups
            .iter()
            .map(|_| Constraint::Ratio(1, groups.len() as u32))
            .collect();
        let rects = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);
        for (index, (group, rect)) in groups.iter().zip(rects.iter()).enumerate() {
            self.render_group(frame, *rect, group, index == self.active_group);
        }
    }

    fn render_group(&self, frame: &mut Frame, area: Rect, group: &CardGroup, active: bool) {
        let fading = self.fade_ticks > 0;
        let mut items: Vec<ListItem> = group
            .cards
            .iter()
            .zip(group.flags.iter())
            .map(|(view, flags)| {
                let mut style = Style::default();
                if flags.highlighted {
                    style = style.fg(self.theme.accent);
                }
                if !flags.enabled || !view.is_visible() || fading {
                    style = style.fg(self.theme.muted);
                }
                let mut spans = vec![Span::styled(view.card().label(), style)];
                if flags.equipped_elsewhere {
                    spans.push(Span::styled(
                        "  (in use)",
                        Style::default().fg(self.theme.muted),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();
        if let Some(hint) = &group.hint {
            items.push(ListItem::new(Line::from(Span::styled(
                hint.clone(),
                Style::default()
                    .fg(self.theme.muted)
                    .add_modifier(Modifier::ITALIC),
            ))));
        }

        let border = if active {
            Style::default().fg(self.theme.accent)
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(group.title.clone()),
            )
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.selection_fg),
            )
            .highlight_symbol("▶ ");

        let mut state = ListState::default();
        if active && !group.is_empty() {
            state.select(Some(group.focus.index()));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_preview(&self, frame: &mut Frame, area: Rect, preview: &HypotheticalPreview) {
        let lines = vec![
            stat_line("Weight", &preview.baseline, &preview.preview, &self.theme, |stats| {
                format!("{}/{}", stats.total_weight, stats.max_weight)
            }),
            stat_line("Cars", &preview.baseline, &preview.preview, &self.theme, |stats| {
                format!("{}/{}", stats.car_count, stats.slot_count)
            }),
        ];
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Preview · {}", preview.train.name)),
        );
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let color = match self.status_level {
            StatusLevel::Info => Color::Reset,
            StatusLevel::Success => self.theme.success,
            StatusLevel::Warning => self.theme.warning,
            StatusLevel::Error => self.theme.danger,
        };
        let help = match self.drawer.state().kind() {
            StateKind::Closed => "↑/↓ train · o composition · l loadout · i inventory · q quit",
            StateKind::Inventory => "←/→ browse · f kind · a status · r rebuild · esc close",
            StateKind::CompositionOverview | StateKind::LoadoutOverview => {
                "tab group · enter edit · c save · esc discard"
            }
            _ => "tab group · ←/→ browse · enter equip/unequip · c done · esc discard",
        };
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(self.status.clone(), Style::default().fg(color))),
            Line::from(Span::styled(help, Style::default().fg(self.theme.muted))),
        ])
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn stat_line(
    label: &str,
    baseline: &TrainStats,
    preview: &TrainStats,
    theme: &Theme,
    format: impl Fn(&TrainStats) -> String,
) -> Line<'static> {
    let over = preview.total_weight > preview.max_weight || preview.car_count > preview.slot_count;
    let after = if over { theme.danger } else { theme.success };
    Line::from(vec![
        Span::raw(format!("{label:<8}")),
        Span::raw(format(baseline)),
        Span::styled(" → ", Style::default().fg(theme.muted)),
        Span::styled(format(preview), Style::default().fg(after)),
    ])
}

fn describe_filter(filter: &InventoryFilter) -> String {
    if filter.is_empty() {
        return "all cards".to_string();
    }
    let mut parts = Vec::new();
    if let Some(kind) = filter.kind {
        parts.push(kind.label().to_string());
    }
    if let Some(status) = filter.status {
        parts.push(format!("{status:?}").to_lowercase());
    }
    if let Some(rarity) = filter.rarity {
        parts.push(format!("{rarity:?}").to_lowercase());
    }
    parts.join(" · ")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}
