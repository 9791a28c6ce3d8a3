//! The bounded classify/fill/advance loop and its batch wrapper.

use std::thread;
use std::time::Duration;

use chrono::Local;
use rand::Rng;
use tracing::{info, warn};

use crate::classify::{PageType, classify};
use crate::config::RunConfig;
use crate::error::AutomatonError;
use crate::page::{ButtonControl, PageDriver, PageSnapshot};
use crate::strategy;

/// Terminal state of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Exhausted,
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Accumulated over one run, sealed when the run ends. Failure keeps every
/// line gathered up to the failure point so partial progress stays
/// diagnosable.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: Outcome,
    pub logs: Vec<String>,
    /// Iterations actually spent, terminal one included.
    pub pages: u32,
}

/// Run-visible progress lines. These are response data, not diagnostics;
/// they are mirrored to tracing on the way through.
#[derive(Debug, Default)]
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        self.lines.push(line);
    }

    fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// How the loop decides the survey is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSignal {
    /// The classifier reports the completion page.
    Text,
    /// The snapshot carries completion-marker elements.
    ClassMarker,
}

/// What the loop does with a page once it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playbook {
    /// Classify, then run the page-type strategy.
    Classified,
    /// No classifier at all; every page gets the generic sweep.
    Generic,
}

#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub max_attempts: u32,
    pub completion: CompletionSignal,
    pub playbook: Playbook,
    /// Stop early when an iteration neither changed a field nor found an
    /// advance control.
    pub stall_exit: bool,
}

impl LoopOptions {
    /// The site-tuned automaton: full classifier, text completion, fixed
    /// budget with no early exit.
    pub fn site() -> Self {
        Self {
            max_attempts: 35,
            completion: CompletionSignal::Text,
            playbook: Playbook::Classified,
            stall_exit: false,
        }
    }

    /// The classifier-free sweep the generic in-page variant runs: larger
    /// budget, class-marker completion, stall exit.
    pub fn generic() -> Self {
        Self {
            max_attempts: 50,
            completion: CompletionSignal::ClassMarker,
            playbook: Playbook::Generic,
            stall_exit: true,
        }
    }
}

/// Drive one survey to a terminal state.
pub fn run(driver: &mut dyn PageDriver, cfg: &RunConfig, opts: &LoopOptions) -> RunReport {
    let mut rng = rand::rng();
    run_with_rng(driver, cfg, opts, &mut rng)
}

/// Same as [`run`] with an injected random source.
pub fn run_with_rng<R: Rng>(
    driver: &mut dyn PageDriver,
    cfg: &RunConfig,
    opts: &LoopOptions,
    rng: &mut R,
) -> RunReport {
    let mut log = RunLog::default();
    let mut pages = 0;
    let outcome = drive(driver, cfg, opts, rng, &mut log, &mut pages);
    RunReport {
        outcome,
        logs: log.into_lines(),
        pages,
    }
}

fn drive<R: Rng>(
    driver: &mut dyn PageDriver,
    cfg: &RunConfig,
    opts: &LoopOptions,
    rng: &mut R,
    log: &mut RunLog,
    pages: &mut u32,
) -> Outcome {
    for attempt in 1..=opts.max_attempts {
        *pages = attempt;
        thread::sleep(cfg.step_delay);

        let snap = match driver.snapshot() {
            Ok(snap) => snap,
            Err(err) => return fail(log, err),
        };
        let page = match opts.playbook {
            Playbook::Classified => classify(&snap),
            Playbook::Generic => PageType::Unknown,
        };
        log.push(format!("Page {attempt}: {page}"));

        let done = match opts.completion {
            CompletionSignal::Text => page == PageType::Complete,
            CompletionSignal::ClassMarker => snap.completion_marker,
        };
        if done {
            log.push("=== Questionnaire termine ===");
            return Outcome::Completed;
        }

        let now = Local::now().naive_local();
        let changed = match strategy::apply(page, &snap, cfg, driver, rng, now, log) {
            Ok(changed) => changed,
            Err(err) => return fail(log, err),
        };

        thread::sleep(cfg.step_delay);

        if !cfg.auto_next {
            log.push("Passe unique terminee");
            return Outcome::Completed;
        }

        match advance(driver, log) {
            Ok(true) => thread::sleep(cfg.step_delay * 2),
            Ok(false) => {
                if opts.stall_exit && !changed {
                    log.push("Aucune action possible");
                    return Outcome::Exhausted;
                }
            }
            Err(err) => return fail(log, err),
        }
    }

    log.push("Nombre maximum de tentatives atteint");
    Outcome::Exhausted
}

fn fail(log: &mut RunLog, err: AutomatonError) -> Outcome {
    let message = err.to_string();
    warn!("{message}");
    log.push(format!("Erreur: {message}"));
    Outcome::Failed(message)
}

/// Locate and activate the next/continue control. Works on a fresh snapshot:
/// the page may have re-rendered while fields were being filled.
fn advance(driver: &mut dyn PageDriver, log: &mut RunLog) -> Result<bool, AutomatonError> {
    let snap = driver.snapshot()?;
    if let Some(button) = find_advance(&snap)
        && driver.activate(&button.handle)?
    {
        log.push("-> Suivant");
        return Ok(true);
    }
    Ok(false)
}

const ADVANCE_WORDS: &[&str] = &["suivant", "next", "continuer"];

/// Selector-pattern pass over id/class/submit attributes first, then a text
/// fallback across the advance vocabulary of the locales the target serves.
pub fn find_advance(snap: &PageSnapshot) -> Option<&ButtonControl> {
    snap.buttons
        .iter()
        .find(|b| b.id_attr.contains("forward") || b.id_attr.contains("next"))
        .or_else(|| {
            snap.buttons
                .iter()
                .find(|b| b.class_attr.contains("next") || b.class_attr.contains("forward"))
        })
        .or_else(|| snap.buttons.iter().find(|b| b.submit))
        .or_else(|| {
            snap.buttons.iter().find(|b| {
                let text = b.text.to_lowercase();
                ADVANCE_WORDS.iter().any(|word| text.contains(word))
            })
        })
}

/// One entry of a batch, tagged with its 1-based run index.
#[derive(Debug)]
pub struct IndexedReport {
    pub index: usize,
    pub report: RunReport,
}

#[derive(Debug)]
pub struct BatchReport {
    pub total: usize,
    pub results: Vec<IndexedReport>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.report.outcome.is_success())
            .count()
    }
}

/// Strictly sequential runs against the same target: each run gets a fresh
/// session from `open_session` and owns it exclusively until the run ends
/// (success, exhaustion or failure), when dropping it closes the session.
/// A session that fails to open becomes that run's failure without aborting
/// the rest of the batch.
pub fn run_batch<D, F>(
    count: usize,
    pause: Duration,
    mut open_session: F,
    cfg: &RunConfig,
    opts: &LoopOptions,
) -> BatchReport
where
    D: PageDriver,
    F: FnMut() -> Result<D, AutomatonError>,
{
    let mut results = Vec::with_capacity(count);
    for index in 1..=count {
        info!("Questionnaire {index}/{count}");
        let report = match open_session() {
            Ok(mut driver) => run(&mut driver, cfg, opts),
            Err(err) => {
                let message = err.to_string();
                warn!("{message}");
                RunReport {
                    outcome: Outcome::Failed(message.clone()),
                    logs: vec![format!("Erreur: {message}")],
                    pages: 0,
                }
            }
        };
        results.push(IndexedReport { index, report });
        if index < count {
            thread::sleep(pause);
        }
    }
    BatchReport {
        total: count,
        results,
    }
}
