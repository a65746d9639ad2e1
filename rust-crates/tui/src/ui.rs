use crate::client::AppSnapshot;
use color_eyre::eyre::{Result, eyre};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{prelude::*, widgets::*};
use std::io::stdout;
use tokio::sync::mpsc;
use wager::{
    MoveChoice, Outcome,
    collectibles::{Collectible, MintRequest},
    round::RoundPhase,
};

#[derive(Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Play(MoveChoice, u64),
    Acknowledge,
    ClaimFaucet,
    Deposit(u64),
    ConfirmMint(MintRequest),
    SelectSkin(Collectible),
    RemoveSkin(MoveChoice),
    RefreshCollectibles,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    stakes: Vec<u64>,
    collectibles: Vec<Collectible>,
    round_idle: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    StakeModal(StakeState),
    DepositModal(DepositState),
    SkinPicker(SkinPickerState),
    MintForm(MintFormState),
    QuitModal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct StakeState {
    choice: MoveChoice,
    idx: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct DepositState {
    amount: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct SkinPickerState {
    idx: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum MintField {
    #[default]
    Name,
    Description,
    ImageUrl,
    Move,
}

impl MintField {
    fn next(self) -> Self {
        match self {
            MintField::Name => MintField::Description,
            MintField::Description => MintField::ImageUrl,
            MintField::ImageUrl => MintField::Move,
            MintField::Move => MintField::Name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct MintFormState {
    name: String,
    description: String,
    image_url: String,
    move_type: MoveChoice,
    focus: MintField,
}

impl Default for MintFormState {
    fn default() -> Self {
        MintFormState {
            name: String::new(),
            description: String::new(),
            image_url: String::new(),
            move_type: MoveChoice::Rock,
            focus: MintField::default(),
        }
    }
}

impl MintFormState {
    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            MintField::Name => Some(&mut self.name),
            MintField::Description => Some(&mut self.description),
            MintField::ImageUrl => Some(&mut self.image_url),
            MintField::Move => None,
        }
    }

    fn request(&self) -> MintRequest {
        MintRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            move_type: self.move_type,
        }
    }
}

fn cycle_move(choice: MoveChoice, forward: bool) -> MoveChoice {
    let all = MoveChoice::ALL;
    let pos = all.iter().position(|c| *c == choice).unwrap_or(0);
    let next = if forward {
        (pos + 1) % all.len()
    } else {
        (pos + all.len() - 1) % all.len()
    };
    all[next]
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    // keep what the modals need to turn keys into events
    state.stakes = snap.stakes.clone();
    state.round_idle = snap.round.phase == RoundPhase::Idle;
    state.collectibles = snap.collectibles.clone();
    if let Mode::SkinPicker(ref mut sp) = state.mode {
        sp.idx = sp.idx.min(state.collectibles.len().saturating_sub(1));
    }
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub type InputEventReceiver = mpsc::UnboundedReceiver<std::io::Result<Event>>;

/// Reads terminal events on a dedicated thread so the event loop can select
/// over them.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            let ev = event::read();
            let failed = ev.is_err();
            if tx.send(ev).is_err() || failed {
                break;
            }
        }
    });
    rx
}

pub async fn next_raw_event(rx: &mut InputEventReceiver) -> Result<Event> {
    match rx.recv().await {
        Some(ev) => Ok(ev?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(k) if k.kind == KeyEventKind::Press => handle_key(state, k.code),
        Event::Resize(..) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn handle_key(state: &mut UiState, code: KeyCode) -> Option<UserEvent> {
    match &mut state.mode {
        Mode::StakeModal(ss) => match code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Left | KeyCode::Up | KeyCode::Char('h') | KeyCode::Char('k') => {
                ss.idx = ss.idx.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Right | KeyCode::Down | KeyCode::Char('l') | KeyCode::Char('j') => {
                if ss.idx + 1 < state.stakes.len() {
                    ss.idx += 1;
                }
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let stake = *state.stakes.get(ss.idx)?;
                let choice = ss.choice;
                state.mode = Mode::Normal;
                Some(UserEvent::Play(choice, stake))
            }
            _ => None,
        },
        Mode::DepositModal(ds) => match code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                if ds.amount == 0 {
                    return None;
                }
                let amount = ds.amount;
                state.mode = Mode::Normal;
                Some(UserEvent::Deposit(amount))
            }
            KeyCode::Up | KeyCode::Char('+') => {
                ds.amount = ds.amount.saturating_add(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('-') => {
                ds.amount = ds.amount.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Backspace => {
                ds.amount /= 10;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let d = c.to_digit(10).unwrap_or(0) as u64;
                ds.amount = ds.amount.saturating_mul(10).saturating_add(d);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::SkinPicker(sp) => match code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Up | KeyCode::Char('k') => {
                sp.idx = sp.idx.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if sp.idx + 1 < state.collectibles.len() {
                    sp.idx += 1;
                }
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let collectible = state.collectibles.get(sp.idx)?.clone();
                state.mode = Mode::Normal;
                Some(UserEvent::SelectSkin(collectible))
            }
            KeyCode::Char('x') => {
                let choice = state.collectibles.get(sp.idx)?.move_type;
                Some(UserEvent::RemoveSkin(choice))
            }
            KeyCode::Char('c') => Some(UserEvent::RefreshCollectibles),
            _ => None,
        },
        Mode::MintForm(mf) => match code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Tab | KeyCode::Down => {
                mf.focus = mf.focus.next();
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let request = mf.request();
                state.mode = Mode::Normal;
                Some(UserEvent::ConfirmMint(request))
            }
            KeyCode::Left | KeyCode::Right if mf.focus == MintField::Move => {
                mf.move_type = cycle_move(mf.move_type, code == KeyCode::Right);
                Some(UserEvent::Redraw)
            }
            KeyCode::Backspace => {
                mf.focused_text()?.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) => {
                mf.focused_text()?.push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::QuitModal => match code {
            KeyCode::Char('y') | KeyCode::Enter => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('r') | KeyCode::Char('p') | KeyCode::Char('s') => {
                if !state.round_idle {
                    return None;
                }
                let choice = match code {
                    KeyCode::Char('r') => MoveChoice::Rock,
                    KeyCode::Char('p') => MoveChoice::Paper,
                    _ => MoveChoice::Scissors,
                };
                state.mode = Mode::StakeModal(StakeState { choice, idx: 0 });
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => Some(UserEvent::Acknowledge),
            KeyCode::Char('f') => Some(UserEvent::ClaimFaucet),
            KeyCode::Char('d') => {
                state.mode = Mode::DepositModal(DepositState::default());
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('k') => {
                state.mode = Mode::SkinPicker(SkinPickerState::default());
                Some(UserEvent::RefreshCollectibles)
            }
            KeyCode::Char('n') => {
                state.mode = Mode::MintForm(MintFormState::default());
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('c') => Some(UserEvent::RefreshCollectibles),
            _ => None,
        },
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // wallet
            Constraint::Length(3),  // pool + faucet
            Constraint::Length(9),  // round + scores
            Constraint::Length(5),  // skins
            Constraint::Min(5),     // status/errors
            Constraint::Length(3),  // help
        ])
        .split(f.area());

    draw_wallet_panel(f, chunks[0], snap);
    draw_pool_panel(f, chunks[1], snap);
    draw_round_row(f, chunks[2], snap);
    draw_skins_panel(f, chunks[3], snap);
    draw_status(f, chunks[4], snap);
    draw_help(f, chunks[5]);
    draw_modals(f, state, snap);
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let text = match &snap.account {
        Some(account) => format!(
            "Network: {} | Account: {} | Balance: {}",
            snap.network,
            account.short(),
            balance_formatted(snap.balances.token_balance, snap.decimals)
        ),
        None => format!(
            "Network: {} | No account connected, open your wallet to connect",
            snap.network
        ),
    };
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn draw_pool_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let optional = |balance: Option<u64>| {
        balance
            .map(|b| balance_formatted(b, snap.decimals))
            .unwrap_or_else(|| "N/A".to_string())
    };
    let faucet = if snap.faucet_available {
        optional(snap.balances.faucet_balance)
    } else {
        "none".to_string()
    };
    let text = format!(
        "Pool: {} | Faucet: {} | Mint fee: {}",
        optional(snap.balances.pool_balance),
        faucet,
        snap.mint_fee
    );
    let widget =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("House"));
    f.render_widget(widget, area);
}

fn draw_round_row(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);
    draw_round_panel(f, cols[0], snap);
    draw_scores_panel(f, cols[1], snap);
}

fn move_with_skin(snap: &AppSnapshot, choice: MoveChoice) -> String {
    match snap.skins.get(choice) {
        Some(skin) => format!("{} [{}]", choice, skin.name),
        None => choice.to_string(),
    }
}

fn outcome_style(outcome: Outcome) -> Style {
    match outcome {
        Outcome::Win => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        Outcome::Lose => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Outcome::Draw => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    }
}

fn draw_round_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let round = &snap.round;
    let mut lines: Vec<Line> = Vec::new();
    let you = round
        .move_choice
        .map(|c| move_with_skin(snap, c))
        .unwrap_or_else(|| "-".to_string());
    let house = round
        .opponent_choice
        .map(|c| c.to_string())
        .unwrap_or_else(|| "?".to_string());
    lines.push(Line::from(format!("You: {you}   House: {house}")));
    match round.phase {
        RoundPhase::Idle => {
            lines.push(Line::from("Pick a move: r Rock | p Paper | s Scissors"));
        }
        RoundPhase::Submitting => {
            lines.push(Line::from("Waiting for the wallet and the ledger..."));
        }
        RoundPhase::Settled => {
            if let Some(outcome) = round.outcome {
                lines.push(Line::styled(format!("Result: {outcome}"), outcome_style(outcome)));
            }
            if let Some(report) = &snap.last_report {
                lines.push(Line::from(format!(
                    "Stake: {} | Payout: {}",
                    report.wager.whole,
                    report
                        .decoded
                        .payout
                        .map(|p| balance_formatted(p, snap.decimals))
                        .unwrap_or_else(|| "-".to_string())
                )));
                lines.push(Line::from(format!("Tx: {}", report.digest)));
            }
            lines.push(Line::from("Enter to play again"));
        }
        RoundPhase::Undecoded => {
            lines.push(Line::styled(
                "Confirmed, but the result could not be read",
                Style::default().fg(Color::Red),
            ));
            lines.push(Line::from("Enter to play again"));
        }
    }
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Round"));
    f.render_widget(widget, area);
}

fn draw_scores_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let tally = snap.tally;
    let lines = vec![
        Line::styled(format!("Wins:   {}", tally.wins), outcome_style(Outcome::Win)),
        Line::styled(format!("Losses: {}", tally.losses), outcome_style(Outcome::Lose)),
        Line::styled(format!("Draws:  {}", tally.draws), outcome_style(Outcome::Draw)),
        Line::from(format!("Rounds: {}", tally.rounds())),
    ];
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Scores"));
    f.render_widget(widget, area);
}

fn draw_skins_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let lines: Vec<Line> = MoveChoice::ALL
        .iter()
        .map(|choice| {
            let skin = snap
                .skins
                .get(*choice)
                .map(|c| format!("{} ({})", c.name, c.image_url))
                .unwrap_or_else(|| "default".to_string());
            Line::from(format!("{choice}: {skin}"))
        })
        .collect();
    let title = format!("Skins ({} owned)", snap.collectibles.len());
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn draw_status(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let status_widget = if snap.errors.is_empty() {
        let mut lines: Vec<Line> = Vec::new();
        if snap.status.trim().is_empty() {
            lines.push(Line::from("Ready"));
        } else {
            for line in snap.status.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let mut lines: Vec<Line> = vec![Line::from(snap.status.clone())];
        // newest first, as many as fit
        for e in snap.errors.iter().rev() {
            lines.push(Line::from(e.clone()).style(Style::default().fg(Color::Red)));
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
    };
    f.render_widget(status_widget, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "r/p/s play | Enter next round | f faucet | d deposit | k skins | n mint | c refresh | q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

/// Whole units with two fractional digits, truncated.
pub fn balance_formatted(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let one_unit = 10u64.saturating_pow(decimals as u32);
    let whole = amount / one_unit;
    let fractional = amount % one_unit;
    let digits = format!("{:0width$}", fractional, width = decimals as usize);
    let cents: String = digits.chars().chain(std::iter::repeat('0')).take(2).collect();
    format!("{whole}.{cents}")
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::Normal => {}
        Mode::StakeModal(ss) => {
            let area = centered_rect(50, 25, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title(format!("Stake on {}", ss.choice));
            let mut spans: Vec<Span> = Vec::new();
            for (i, stake) in state.stakes.iter().enumerate() {
                let style = if i == ss.idx {
                    Style::default().fg(Color::Black).bg(Color::Yellow)
                } else {
                    Style::default()
                };
                spans.push(Span::styled(format!(" {stake} "), style));
                spans.push(Span::raw(" "));
            }
            let lines = vec![
                Line::from(spans),
                Line::from(""),
                Line::from("←/→ choose | Enter=play | Esc=cancel"),
            ];
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(lines), block.inner(area));
        }
        Mode::DepositModal(ds) => {
            let area = centered_rect(40, 25, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Deposit to Pool");
            let p = Paragraph::new(format!(
                "Amount: {}\nBalance: {}\nEnter=confirm Esc=cancel +/- or digits to edit",
                ds.amount,
                balance_formatted(snap.balances.token_balance, snap.decimals)
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::SkinPicker(sp) => {
            let area = centered_rect(60, 60, f.area());
            let block = Block::default().borders(Borders::ALL).title("Skins");
            let mut lines = Vec::new();
            if state.collectibles.is_empty() {
                lines.push(Line::from("No collectibles owned, press n to mint one"));
            } else {
                for (i, c) in state.collectibles.iter().enumerate() {
                    let cur = if i == sp.idx { ">" } else { " " };
                    let active = if snap.skins.get(c.move_type) == Some(c) {
                        "*"
                    } else {
                        " "
                    };
                    lines.push(Line::from(format!(
                        "{cur}{active} {} [{}] {}",
                        c.name,
                        c.move_type,
                        c.id.short()
                    )));
                }
            }
            lines.push(Line::from(""));
            lines.push(Line::from(
                "↑/↓ select | Enter=use | x=reset move | c=refresh | Esc=close",
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(
                Paragraph::new(lines).wrap(Wrap { trim: false }),
                block.inner(area),
            );
        }
        Mode::MintForm(mf) => {
            let area = centered_rect(60, 40, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title(format!("Mint Collectible (fee {})", snap.mint_fee));
            let field = |label: &str, value: &str, focus: MintField| {
                let marker = if mf.focus == focus { ">" } else { " " };
                Line::from(format!("{marker} {label}: {value}"))
            };
            let lines = vec![
                field("Name", &mf.name, MintField::Name),
                field("Description", &mf.description, MintField::Description),
                field("Image URL", &mf.image_url, MintField::ImageUrl),
                field("Move", mf.move_type.label(), MintField::Move),
                Line::from(""),
                Line::from("Tab next field | ←/→ change move | Enter=mint | Esc=cancel"),
            ];
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(
                Paragraph::new(lines).wrap(Wrap { trim: false }),
                block.inner(area),
            );
        }
        Mode::QuitModal => {
            let area = centered_rect(30, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Quit");
            let p = Paragraph::new("Quit the game? y/n");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
