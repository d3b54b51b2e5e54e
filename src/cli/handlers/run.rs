use crate::{
    CancellationToken,
    cli::ParsedCommandLine,
    core::{
        config_loader,
        resolver::{self, InputSource},
        task_executor::{Executor, ExecutorError},
        tasks::{Task, TaskList, TaskListSet},
        template::CommandTemplate,
    },
    models::{RunConfig, RunSummary},
    system::{
        executor::{CommandRunner, ShellRunner},
        output::{OutputSink, TerminalSink},
    },
};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// How stdin takes part in the run. Decided once, before anything is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputPlan {
    /// Stdin alone: its lines form the first (and only) task list.
    StdinList,
    /// Explicit sources: each stdin line (if any) runs on its own, then the
    /// cross-product of the sources is run.
    Sources { stream_stdin: bool },
    /// Neither stdin nor sources: nothing to do.
    Nothing,
}

impl InputPlan {
    fn decide(stdin_piped: bool, has_sources: bool) -> Self {
        match (stdin_piped, has_sources) {
            (true, false) => Self::StdinList,
            (stdin_piped, true) => Self::Sources {
                stream_stdin: stdin_piped,
            },
            (false, false) => Self::Nothing,
        }
    }
}

///
/// Main entry point for a run: real stdin, real processes, real terminal.
///
pub async fn handle(
    parsed: ParsedCommandLine,
    cancellation_token: &CancellationToken,
) -> Result<RunSummary> {
    let file_config = config_loader::load_file_config()?;
    let config = config_loader::resolve_run_config(&file_config, &parsed.cli.config_overrides());
    log::debug!("Resolved run configuration: {:?}", config);

    let stdin = (!std::io::stdin().is_terminal()).then(|| BufReader::new(tokio::io::stdin()));
    let runner = ShellRunner::new(config.exec_mode.clone());
    run_with(
        parsed,
        config,
        stdin,
        runner,
        Arc::new(TerminalSink),
        cancellation_token,
    )
    .await
}

/// Runs with injected collaborators. `stdin` is `None` when it is interactive.
pub async fn run_with<B, R>(
    parsed: ParsedCommandLine,
    config: RunConfig,
    stdin: Option<B>,
    runner: R,
    sink: Arc<dyn OutputSink>,
    cancellation_token: &CancellationToken,
) -> Result<RunSummary>
where
    B: AsyncBufRead + Unpin,
    R: CommandRunner,
{
    let plan = InputPlan::decide(stdin.is_some(), !parsed.sources.is_empty());
    log::debug!("Input plan: {:?}", plan);
    if plan == InputPlan::Nothing {
        log::info!("No input given (no piped stdin, no -a/-f lists). Nothing to run.");
        return Ok(RunSummary::default());
    }

    let config = Arc::new(config);
    let template = CommandTemplate::parse(parsed.cli.command.as_deref().unwrap_or_default());
    let mut executor = Executor::new(
        Arc::clone(&config),
        template,
        runner,
        sink,
        Arc::clone(cancellation_token),
    );

    // A fatal error stops further dispatch, but whatever already started is
    // still awaited and its output flushed before the error surfaces.
    let result = drive(&mut executor, plan, stdin, &parsed.sources, &config).await;
    let summary = executor.finish().await;
    result?;

    if summary.interrupted {
        return Err(ExecutorError::Interrupted.into());
    }
    Ok(summary)
}

async fn drive<B, R>(
    executor: &mut Executor<R>,
    plan: InputPlan,
    stdin: Option<B>,
    sources: &[InputSource],
    config: &RunConfig,
) -> Result<()>
where
    B: AsyncBufRead + Unpin,
    R: CommandRunner,
{
    let mut rng = StdRng::from_entropy();
    let mut set = TaskListSet::new();

    match (plan, stdin) {
        (InputPlan::StdinList, Some(reader)) => {
            let mut list = read_stdin_list(reader).await?;
            if config.shuffle {
                list.shuffle(&mut rng);
            }
            set.add_task_list(list)?;
        }
        (InputPlan::Sources { stream_stdin }, stdin) => {
            if let (true, Some(reader)) = (stream_stdin, stdin) {
                stream_stdin_lines(reader, executor).await?;
            }
            for source in sources {
                let list = resolver::resolve_source(source, config.shuffle.then_some(&mut rng))
                    .with_context(|| format!("Failed to resolve input {}", describe(source)))?;
                set.add_task_list(list)?;
            }
        }
        _ => return Ok(()),
    }

    executor.dispatch_all(&mut set).await?;
    Ok(())
}

/// Reads every non-blank stdin line into one task list.
async fn read_stdin_list<B: AsyncBufRead + Unpin>(reader: B) -> Result<TaskList> {
    let mut list = TaskList::new();
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        let item = line.trim();
        if !item.is_empty() {
            list.add(item);
        }
    }
    log::debug!("Read {} task(s) from stdin.", list.len());
    Ok(list)
}

/// Dispatches each non-blank stdin line as its own single-task invocation, as it arrives.
async fn stream_stdin_lines<B, R>(reader: B, executor: &mut Executor<R>) -> Result<()>
where
    B: AsyncBufRead + Unpin,
    R: CommandRunner,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        let item = line.trim();
        if item.is_empty() {
            continue;
        }
        executor.dispatch_group(vec![Task::new(item)]).await?;
    }
    Ok(())
}

fn describe(source: &InputSource) -> String {
    match source {
        InputSource::Arguments(raw) => format!("'-a {}'", raw),
        InputSource::File(path) => format!("'-f {}'", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::models::{CapturedOutput, Invocation};
    use crate::system::executor::ExecutionError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst};

    #[derive(Default)]
    struct CountingRunner {
        calls: Arc<AtomicUsize>,
    }

    impl CommandRunner for CountingRunner {
        async fn run(&self, command_line: String) -> Result<CapturedOutput, ExecutionError> {
            self.calls.fetch_add(1, SeqCst);
            Ok(CapturedOutput::ok(command_line))
        }
    }

    #[derive(Default)]
    struct LineSink {
        lines: Mutex<Vec<String>>,
    }

    impl OutputSink for LineSink {
        fn emit(&self, invocation: &Invocation) {
            self.lines
                .lock()
                .unwrap()
                .push(invocation.command_line.clone());
        }
    }

    fn parse(args: &[&str]) -> ParsedCommandLine {
        let mut argv = vec!["fanrun"];
        argv.extend_from_slice(args);
        Cli::try_parse_with_sources(argv).unwrap()
    }

    fn keep_order(dry_run: bool) -> RunConfig {
        RunConfig {
            slots: 2,
            dry_run,
            keep_order: true,
            ..RunConfig::default()
        }
    }

    fn token() -> CancellationToken {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn test_input_plan_decision() {
        assert_eq!(InputPlan::decide(true, false), InputPlan::StdinList);
        assert_eq!(
            InputPlan::decide(true, true),
            InputPlan::Sources { stream_stdin: true }
        );
        assert_eq!(
            InputPlan::decide(false, true),
            InputPlan::Sources {
                stream_stdin: false
            }
        );
        assert_eq!(InputPlan::decide(false, false), InputPlan::Nothing);
    }

    #[tokio::test]
    async fn test_stdin_alone_forms_the_task_list() {
        let sink = Arc::new(LineSink::default());
        let stdin: &[u8] = b"alpha\n\n  beta  \n";
        let summary = run_with(
            parse(&["echo {}"]),
            keep_order(true),
            Some(stdin),
            CountingRunner::default(),
            sink.clone(),
            &token(),
        )
        .await
        .unwrap();

        assert_eq!(summary.dispatched, 2);
        assert_eq!(*sink.lines.lock().unwrap(), vec!["echo alpha", "echo beta"]);
    }

    #[tokio::test]
    async fn test_stdin_with_sources_runs_lines_individually_first() {
        let sink = Arc::new(LineSink::default());
        let stdin: &[u8] = b"x\ny\n";
        let summary = run_with(
            parse(&["-a", "1 2", "-a", "a b", "echo {}"]),
            keep_order(true),
            Some(stdin),
            CountingRunner::default(),
            sink.clone(),
            &token(),
        )
        .await
        .unwrap();

        assert_eq!(summary.dispatched, 6);
        assert_eq!(
            *sink.lines.lock().unwrap(),
            vec!["echo x", "echo y", "echo 1 a", "echo 1 b", "echo 2 a", "echo 2 b"]
        );
    }

    #[tokio::test]
    async fn test_nothing_to_do_without_inputs() {
        let runner = CountingRunner::default();
        let calls = Arc::clone(&runner.calls);
        let summary = run_with(
            parse(&["echo {}"]),
            keep_order(false),
            None::<&[u8]>,
            runner,
            Arc::new(LineSink::default()),
            &token(),
        )
        .await
        .unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(calls.load(SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolution_error_awaits_already_started_invocations() {
        let runner = CountingRunner::default();
        let calls = Arc::clone(&runner.calls);
        let sink = Arc::new(LineSink::default());
        let stdin: &[u8] = b"first\nsecond\n";

        let result = run_with(
            parse(&["-a", "{1..nope}", "echo {}"]),
            keep_order(false),
            Some(stdin),
            runner,
            sink.clone(),
            &token(),
        )
        .await;

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Malformed range"));
        assert_eq!(calls.load(SeqCst), 2);
        assert_eq!(sink.lines.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_real_runs_go_through_the_runner() {
        let runner = CountingRunner::default();
        let calls = Arc::clone(&runner.calls);
        let summary = run_with(
            parse(&["-a", "{1..3}", "work"]),
            keep_order(false),
            None::<&[u8]>,
            runner,
            Arc::new(LineSink::default()),
            &token(),
        )
        .await
        .unwrap();

        assert_eq!(calls.load(SeqCst), 3);
        assert_eq!(summary.succeeded, 3);
        assert!(summary.peak_running <= 2);
    }

    #[tokio::test]
    async fn test_interrupted_run_is_an_error() {
        let cancel = token();
        cancel.store(true, SeqCst);
        let result = run_with(
            parse(&["-a", "1 2", "echo"]),
            keep_order(false),
            None::<&[u8]>,
            CountingRunner::default(),
            Arc::new(LineSink::default()),
            &cancel,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecutorError>(),
            Some(ExecutorError::Interrupted)
        ));
    }
}
