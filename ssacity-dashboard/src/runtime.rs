//! Main loop: refresh timer, clock timer, manual commands
//!
//! The loop owns the `Dashboard`. Fetches run on spawned tasks and report back
//! over a channel, so the clock keeps ticking while requests are in flight and
//! a manual refresh can overlap a timer cycle.

use crate::bands::FillBand;
use crate::client::ApiClient;
use crate::dashboard::{fetch_snapshot, CycleResult, Dashboard, RefreshOutcome};
use crate::export::ExportDocument;
use crate::filter::BinFilter;
use crate::render::Tab;
use anyhow::Result;
use chrono::Local;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Manual input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh,
    Search(String),
    Band(FillBand),
    ClearFilter,
    Tab(Tab),
    Details(String),
    Export,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((v, a)) => (v, a.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "r" | "refresh" | "retry" => Ok(Command::Refresh),
            "search" | "/" => Ok(Command::Search(arg.to_string())),
            "band" => arg.parse().map(Command::Band),
            "clear" => Ok(Command::ClearFilter),
            "tab" => arg.parse().map(Command::Tab),
            "details" | "d" if !arg.is_empty() => Ok(Command::Details(arg.to_string())),
            "details" | "d" => Err("usage: details <bin_id>".to_string()),
            "export" | "e" => Ok(Command::Export),
            "help" | "h" | "?" => Ok(Command::Help),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command '{other}' (type 'help')")),
        }
    }
}

pub const HELP: &str = "\
Commands:
  r | refresh           fetch now
  search <text>         filter bins by id or location
  band <low|medium|high|critical>
  clear                 remove the bin filter
  tab <overview|bins|alerts|analytics>
  details <bin_id>      show one bin
  export                write a JSON report
  q | quit
";

/// Forward parsed stdin lines to the loop until EOF.
pub fn spawn_command_reader<R>(reader: R, tx: mpsc::Sender<Command>) -> tokio::task::JoinHandle<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match line.parse::<Command>() {
                    Ok(cmd) => {
                        if tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Err(e) if line.trim().is_empty() => debug!("{}", e),
                    Err(e) => warn!("{}", e),
                },
                Ok(None) => {
                    debug!("Command input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read command input: {}", e);
                    break;
                }
            }
        }
    })
}

pub struct Runtime<W: Write> {
    dashboard: Dashboard,
    client: Arc<ApiClient>,
    out: W,
}

impl<W: Write> Runtime<W> {
    pub fn new(dashboard: Dashboard, client: ApiClient, out: W) -> Self {
        Self {
            dashboard,
            client: Arc::new(client),
            out,
        }
    }

    /// Run until `Quit`. A closed command channel only stops command
    /// handling; polling goes on. Returns the dashboard in its final state.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<Dashboard> {
        info!("Polling {} every {}s", self.client.base_url(), self.dashboard.config().refresh.interval_secs);

        let (results_tx, mut results_rx) = mpsc::channel::<CycleResult>(16);
        let mut refresh_timer = interval(self.dashboard.config().refresh_interval());
        let mut clock_timer = interval(self.dashboard.config().clock_interval());
        clock_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commands_open = true;

        loop {
            tokio::select! {
                // fires immediately first, then every interval whatever the last outcome
                _ = refresh_timer.tick() => {
                    self.start_cycle(&results_tx);
                }

                _ = clock_timer.tick() => {
                    let line = self.dashboard.status_line(Local::now());
                    write!(self.out, "\r{line}")?;
                    self.out.flush()?;
                }

                Some(result) = results_rx.recv() => {
                    let outcome = self.dashboard.apply(result);
                    debug!("Cycle outcome: {:?}", outcome);
                    if outcome == RefreshOutcome::Retained {
                        writeln!(self.out)?;
                    }
                    self.draw()?;
                }

                cmd = commands.recv(), if commands_open => {
                    match cmd {
                        Some(Command::Quit) => {
                            info!("Dashboard stopping");
                            writeln!(self.out)?;
                            return Ok(self.dashboard);
                        }
                        Some(cmd) => self.handle(cmd, &results_tx).await?,
                        None => {
                            info!("Command input closed, polling continues");
                            commands_open = false;
                        }
                    }
                }
            }
        }
    }

    fn start_cycle(&mut self, results_tx: &mpsc::Sender<CycleResult>) {
        let cycle = self.dashboard.begin_cycle();
        let client = Arc::clone(&self.client);
        let profile = self.dashboard.config().api.profile;
        let tx = results_tx.clone();

        debug!("Cycle {} started", cycle);
        tokio::spawn(async move {
            let outcome = fetch_snapshot(&client, profile).await;
            if tx.send(CycleResult { cycle, outcome }).await.is_err() {
                debug!("Cycle {} finished after shutdown", cycle);
            }
        });
    }

    async fn handle(&mut self, cmd: Command, results_tx: &mpsc::Sender<CycleResult>) -> Result<()> {
        match cmd {
            Command::Refresh => {
                info!("Manual refresh");
                self.start_cycle(results_tx);
            }
            Command::Search(term) => {
                self.dashboard.set_filter(BinFilter::search(term));
                self.draw()?;
            }
            Command::Band(band) => {
                self.dashboard.set_filter(BinFilter::Band(band));
                self.draw()?;
            }
            Command::ClearFilter => {
                self.dashboard.set_filter(BinFilter::All);
                self.draw()?;
            }
            Command::Tab(tab) => {
                self.dashboard.set_tab(tab);
                self.draw()?;
            }
            Command::Details(bin_id) => match self.dashboard.bin_details(&bin_id) {
                Some(text) => write!(self.out, "\n{text}")?,
                None => writeln!(self.out, "\nNo bin '{bin_id}' in the current snapshot")?,
            },
            Command::Export => {
                let doc = ExportDocument::capture(&self.dashboard.snapshot());
                match doc.write_to(&self.dashboard.config().export.dir).await {
                    Ok(path) => writeln!(self.out, "\nData exported to {}", path.display())?,
                    Err(e) => {
                        error!("Export failed: {:#}", e);
                        writeln!(self.out, "\nExport failed: {e}")?;
                    }
                }
            }
            Command::Help => write!(self.out, "\n{HELP}")?,
            // handled by the loop
            Command::Quit => {}
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        write!(self.out, "\n{}", self.dashboard.screen())?;
        self.out.flush()?;
        Ok(())
    }
}
