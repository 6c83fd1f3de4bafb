use futures_util::FutureExt;
use mvvm_command::param::raw;
use mvvm_command::{
    AsyncCommand, AsyncCommandConfig, Command, CommandError, ExecutionOutcome, NoParam,
    PropertyChanged, SyncCommand, async_fn, sync_fn,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("storage offline: {code}")]
struct StorageOffline {
    code: u16,
}

/// 记录命令发出的全部通知，便于断言时序
fn record(cmd: &dyn Command) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let events = cmd.events();
    {
        let log = log.clone();
        events
            .can_execute_changed
            .subscribe(move |_| log.lock().unwrap().push("can_execute_changed".into()));
    }
    {
        let log = log.clone();
        events
            .executing
            .subscribe(move |_| log.lock().unwrap().push("executing".into()));
    }
    {
        let log = log.clone();
        events.executed.subscribe(move |e| {
            log.lock()
                .unwrap()
                .push(format!("executed:{:?}", e.outcome))
        });
    }
    log
}

#[test]
fn no_param_sync_command_sets_flag() {
    let flag = Arc::new(AtomicBool::new(false));
    let cmd = {
        let flag = flag.clone();
        SyncCommand::new(
            "set-flag",
            sync_fn(move |_: NoParam| {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }),
        )
    };

    assert!(cmd.can_execute(None));
    cmd.invoke(None);

    assert!(flag.load(Ordering::SeqCst));
    assert!(cmd.last_error().is_none());
    assert!(!cmd.is_executing());
}

#[test]
fn numeric_command_given_a_string_is_silently_rejected() {
    let runs = Arc::new(AtomicUsize::new(0));
    let cmd = {
        let runs = runs.clone();
        SyncCommand::new(
            "add",
            sync_fn(move |n: i64| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(n + 1)
            }),
        )
    };
    let log = record(&cmd);

    let text = "12".to_string();
    assert!(!cmd.can_execute(raw(&text)));
    assert!(!cmd.can_execute(None));
    cmd.invoke(raw(&text));
    cmd.invoke(None);

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(log.lock().unwrap().is_empty(), "no events for rejected input");
    assert!(cmd.last_error().is_none());
    assert!(!cmd.is_executing());
    assert_eq!(cmd.result(), None);
}

#[test]
fn accepted_attempt_emits_in_documented_order() {
    let cmd = SyncCommand::new("ordered", sync_fn(|n: i32| Ok(n)));
    let log = record(&cmd);

    cmd.invoke(raw(&1_i32));

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "can_execute_changed",
            "executing",
            "can_execute_changed",
            "executed:Success",
        ]
    );
}

#[test]
fn nested_call_from_executing_observer_is_rejected() {
    let runs = Arc::new(AtomicUsize::new(0));
    let cmd = {
        let runs = runs.clone();
        Arc::new(SyncCommand::new(
            "reentrant",
            sync_fn(move |_: NoParam| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ))
    };

    let nested = Arc::new(Mutex::new(Vec::new()));
    {
        let weak = Arc::downgrade(&cmd);
        let nested = nested.clone();
        cmd.events().executing.subscribe(move |_| {
            if let Some(cmd) = weak.upgrade() {
                nested.lock().unwrap().push(cmd.can_execute(None));
                cmd.invoke(None);
            }
        });
    }

    cmd.invoke(None);

    assert_eq!(*nested.lock().unwrap(), vec![false]);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!cmd.is_executing());
}

#[test]
fn outcomes_are_classified() {
    let runs = Arc::new(AtomicUsize::new(0));
    let cmd = {
        let runs = runs.clone();
        SyncCommand::new(
            "classify",
            sync_fn(move |code: u16| {
                runs.fetch_add(1, Ordering::SeqCst);
                if code == 0 {
                    Ok(())
                } else {
                    Err(StorageOffline { code }.into())
                }
            }),
        )
    };
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    {
        let outcomes = outcomes.clone();
        cmd.events()
            .executed
            .subscribe(move |e| outcomes.lock().unwrap().push(e.outcome));
    }

    cmd.invoke(raw(&0_u16));
    assert!(cmd.last_error().is_none());

    cmd.invoke(raw(&503_u16));
    let fault = cmd.last_error().expect("failure is recorded");
    assert_eq!(
        fault.downcast_ref::<StorageOffline>(),
        Some(&StorageOffline { code: 503 })
    );

    let veto = cmd.events().executing.subscribe(|e| e.veto());
    cmd.invoke(raw(&0_u16));
    assert!(cmd.last_error().is_none(), "veto clears the previous error");
    cmd.events().executing.unsubscribe(veto);

    assert_eq!(runs.load(Ordering::SeqCst), 2, "vetoed work never runs");
    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![
            ExecutionOutcome::Success,
            ExecutionOutcome::Failure,
            ExecutionOutcome::Cancelled,
        ]
    );
}

#[test]
fn property_changes_are_announced() {
    let cmd = SyncCommand::new(
        "props",
        sync_fn(|fail: bool| {
            anyhow::ensure!(!fail, "asked to fail");
            Ok(1_u8)
        }),
    );
    let props = Arc::new(Mutex::new(Vec::new()));
    {
        let props = props.clone();
        cmd.events()
            .property_changed
            .subscribe(move |e: &PropertyChanged| props.lock().unwrap().push(e.property));
    }

    cmd.invoke(raw(&true));
    cmd.invoke(raw(&false));

    assert_eq!(
        *props.lock().unwrap(),
        vec![
            "is_executing",
            "last_error",
            "is_executing",
            "last_error",
            "is_executing",
            "result",
            "is_executing",
        ]
    );
}

#[tokio::test]
async fn async_command_failure_is_captured() {
    let cmd = AsyncCommand::new(
        "sync-remote",
        async_fn(|_: NoParam| async move {
            tokio::task::yield_now().await;
            Err::<(), _>(anyhow::Error::new(StorageOffline { code: 42 }))
        }),
    );
    let outcome = Arc::new(Mutex::new(None));
    {
        let outcome = outcome.clone();
        cmd.events()
            .executed
            .subscribe(move |e| *outcome.lock().unwrap() = Some(e.outcome));
    }

    cmd.execute(None).await;

    assert_eq!(*outcome.lock().unwrap(), Some(ExecutionOutcome::Failure));
    let fault = cmd.last_error().expect("fault recorded");
    assert_eq!(
        fault.downcast_ref::<StorageOffline>(),
        Some(&StorageOffline { code: 42 })
    );
    assert!(!cmd.is_executing());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn background_work_finishes_before_completion_is_reported() {
    let finished = Arc::new(AtomicBool::new(false));
    let cmd = {
        let finished = finished.clone();
        AsyncCommand::with_config(
            "offload",
            async_fn(move |n: u64| {
                let finished = finished.clone();
                async move {
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    finished.store(true, Ordering::SeqCst);
                    anyhow::Ok(n * 10)
                }
            }),
            AsyncCommandConfig::builder()
                .execute_in_background(true)
                .build(),
        )
    };

    let seen_finished = Arc::new(Mutex::new(None));
    {
        let finished = finished.clone();
        let seen_finished = seen_finished.clone();
        cmd.events().executed.subscribe(move |_| {
            *seen_finished.lock().unwrap() = Some(finished.load(Ordering::SeqCst));
        });
    }

    cmd.execute_with(4).await;

    assert_eq!(*seen_finished.lock().unwrap(), Some(true));
    assert_eq!(cmd.result(), Some(40));
    assert!(!cmd.is_executing());
}

#[test]
fn background_work_runs_on_the_configured_runtime() {
    let background = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("mvvm-background")
        .enable_all()
        .build()
        .unwrap();
    let caller = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let cmd = AsyncCommand::with_config(
        "thread-name",
        async_fn(|_: NoParam| async move {
            anyhow::Ok(std::thread::current().name().map(str::to_string))
        }),
        AsyncCommandConfig::builder()
            .execute_in_background(true)
            .runtime(background.handle().clone())
            .build(),
    );

    caller.block_on(cmd.execute(None));

    assert_eq!(cmd.result(), Some(Some("mvvm-background".to_string())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_execute_while_running_is_rejected() {
    let gate = Arc::new(tokio::sync::Notify::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let cmd = {
        let gate = gate.clone();
        let runs = runs.clone();
        Arc::new(AsyncCommand::new(
            "gated",
            async_fn(move |_: NoParam| {
                let gate = gate.clone();
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    gate.notified().await;
                    anyhow::Ok(())
                }
            }),
        ))
    };

    let first = {
        let cmd = cmd.clone();
        tokio::spawn(async move { cmd.execute(None).await })
    };
    while !cmd.is_executing() {
        tokio::task::yield_now().await;
    }

    assert!(!cmd.can_execute(None));
    cmd.execute(None).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    gate.notify_one();
    first.await.unwrap();
    assert!(!cmd.is_executing());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

/// 记录“已完成”通知中的结果
fn outcomes(cmd: &dyn Command) -> Arc<Mutex<Vec<ExecutionOutcome>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    cmd.events()
        .executed
        .subscribe(move |e| sink.lock().unwrap().push(e.outcome));
    seen
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_background_execution_still_runs_one_unit_at_a_time() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));
    let cmd = {
        let (running, peak, runs) = (running.clone(), peak.clone(), runs.clone());
        AsyncCommand::with_config(
            "slow-sync",
            async_fn(move |_: NoParam| {
                let (running, peak, runs) = (running.clone(), peak.clone(), runs.clone());
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    anyhow::Ok(7_u8)
                }
            }),
            AsyncCommandConfig::builder()
                .execute_in_background(true)
                .build(),
        )
    };
    let seen = outcomes(&cmd);

    let abandoned = tokio::time::timeout(Duration::from_millis(20), cmd.execute(None)).await;
    assert!(abandoned.is_err());
    assert!(cmd.is_executing(), "offloaded work is still running");

    cmd.execute(None).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1, "second call is rejected");

    while seen.lock().unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), vec![ExecutionOutcome::Success]);
    assert_eq!(cmd.result(), Some(7));
    assert!(!cmd.is_executing());
    assert!(cmd.last_error().is_none());
}

#[tokio::test]
async fn abandoned_inline_execution_is_an_interrupted_failure() {
    let cmd = AsyncCommand::new(
        "stalled",
        async_fn(|_: NoParam| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            anyhow::Ok(())
        }),
    );
    let seen = outcomes(&cmd);

    let abandoned = tokio::time::timeout(Duration::from_millis(10), cmd.execute(None)).await;
    assert!(abandoned.is_err());

    assert!(!cmd.is_executing());
    assert_eq!(*seen.lock().unwrap(), vec![ExecutionOutcome::Failure]);
    let fault = cmd.last_error().expect("interruption recorded");
    assert_eq!(
        fault.downcast_ref::<CommandError>(),
        Some(&CommandError::Interrupted {
            command: "stalled".into()
        })
    );
}

#[test]
fn background_dispatch_without_runtime_is_a_failure() {
    let cmd = AsyncCommand::with_config(
        "orphan",
        async_fn(|_: NoParam| async move { anyhow::Ok(()) }),
        AsyncCommandConfig::builder()
            .execute_in_background(true)
            .build(),
    );
    let seen = outcomes(&cmd);

    assert_eq!(cmd.execute(None).now_or_never(), Some(()));

    assert_eq!(*seen.lock().unwrap(), vec![ExecutionOutcome::Failure]);
    let fault = cmd.last_error().expect("missing runtime recorded");
    assert_eq!(
        fault.downcast_ref::<CommandError>(),
        Some(&CommandError::NoRuntime {
            command: "orphan".into()
        })
    );
    assert!(!cmd.is_executing());
}

#[test]
fn background_runtime_shutdown_is_reported_as_aborted() {
    let background = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let caller = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let (started_tx, started_rx) = mpsc::channel::<()>();
    let cmd = AsyncCommand::with_config(
        "long-haul",
        async_fn(move |_: NoParam| {
            let started = started_tx.clone();
            async move {
                let _ = started.send(());
                tokio::time::sleep(Duration::from_secs(60)).await;
                anyhow::Ok(())
            }
        }),
        AsyncCommandConfig::builder()
            .execute_in_background(true)
            .runtime(background.handle().clone())
            .build(),
    );
    let seen = outcomes(&cmd);

    let shutdown = std::thread::spawn(move || {
        started_rx.recv().unwrap();
        background.shutdown_background();
    });
    caller.block_on(cmd.execute(None));
    shutdown.join().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![ExecutionOutcome::Failure]);
    let fault = cmd.last_error().expect("abort recorded");
    assert!(matches!(
        fault.downcast_ref::<CommandError>(),
        Some(CommandError::BackgroundAborted { command, .. }) if command == "long-haul"
    ));
    assert!(!cmd.is_executing());
}
