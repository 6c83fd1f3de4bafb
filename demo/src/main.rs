use async_trait::async_trait;
use mvvm_command::param::raw;
use mvvm_command::{
    AsyncCommand, AsyncCommandConfig, Command, NoParam, SyncCommand, async_fn, sync_fn,
};
use mvvm_viewmodel::{ActionOwner, DataLoader, DataViewModel, ItemViewModel, PropertySetters};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum MailError {
    #[error("folder not found: {0}")]
    UnknownFolder(String),
    #[error("message not found: {0}")]
    NotFound(u32),
}

#[derive(Debug, Clone)]
struct Message {
    id: u32,
    subject: String,
}

type Store = Arc<Mutex<Vec<Message>>>;

struct Mailbox {
    store: Store,
}

#[async_trait]
impl DataLoader for Mailbox {
    type Param = String;

    async fn load(&self, owner: &ActionOwner, folder: String) -> anyhow::Result<()> {
        info!(owner = owner.name(), %folder, "loading folder");
        tokio::time::sleep(Duration::from_millis(10)).await;
        if folder != "inbox" {
            return Err(MailError::UnknownFolder(folder).into());
        }
        *self.store.lock().unwrap() = vec![
            Message {
                id: 1,
                subject: "quarterly report".into(),
            },
            Message {
                id: 2,
                subject: "lunch?".into(),
            },
        ];
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store: Store = Arc::default();
    let mailbox = DataViewModel::new(
        "mailbox",
        Mailbox {
            store: store.clone(),
        },
    );

    mailbox.load(raw(&"drafts".to_string())).await;
    println!(
        "load drafts: loaded={}, error={:?}",
        mailbox.is_loaded(),
        mailbox.owner().error().map(|e| e.to_string())
    );

    mailbox.load(raw(&"inbox".to_string())).await;
    println!(
        "load inbox: loaded={}, messages={}",
        mailbox.is_loaded(),
        store.lock().unwrap().len()
    );

    let archive = {
        let store = store.clone();
        Arc::new(SyncCommand::new(
            "archive",
            sync_fn(move |id: u32| {
                let mut messages = store.lock().unwrap();
                let index = messages
                    .iter()
                    .position(|m| m.id == id)
                    .ok_or(MailError::NotFound(id))?;
                Ok(messages.remove(index).subject)
            }),
        ))
    };

    let refresh = {
        let store = store.clone();
        Arc::new(AsyncCommand::with_config(
            "refresh",
            async_fn(move |_: NoParam| {
                let store = store.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    anyhow::Ok(store.lock().unwrap().len())
                }
            }),
            AsyncCommandConfig::builder()
                .execute_in_background(true)
                .build(),
        ))
    };

    let owner = mailbox.owner();
    owner
        .register_command(&archive, |e| {
            println!("archive finished: {:?}", e.outcome);
            Ok(())
        })
        .expect("archive registers");
    owner
        .register_command(&refresh, |e| {
            println!("refresh finished: {:?}", e.outcome);
            Ok(())
        })
        .expect("refresh registers");

    println!("can archive \"1\": {}", archive.can_execute(raw(&"1")));
    archive.invoke(raw(&1_u32));
    println!("archived: {:?}", archive.result());

    archive.invoke(raw(&1_u32));
    println!(
        "archive again: error={:?}, previous result kept={:?}",
        archive.last_error().map(|e| e.to_string()),
        archive.result()
    );

    refresh.execute(None).await;
    println!(
        "refresh: result={:?}, busy={}",
        refresh.result(),
        owner.is_busy()
    );

    let rows: Vec<_> = store
        .lock()
        .unwrap()
        .iter()
        .cloned()
        .map(ItemViewModel::new)
        .collect();
    let setters = PropertySetters::new().with(
        "is_selected",
        |row: &ItemViewModel<Message>, selected: bool| row.set_selected(selected),
    );
    for row in &rows {
        let subject = row.item().subject.clone();
        row.selection_changed().subscribe(move |selected| {
            println!("{subject}: selected={selected}");
        });
        if let Err(err) = setters.set_value(row, "is_selected", &true) {
            println!("select failed: {err}");
        }
        if let Err(err) = setters.set_value(row, "is_pinned", &true) {
            println!("pin failed: {err}");
        }
    }

    owner.deregister(&*archive);
    owner.deregister(&*refresh);
    println!("registered after cleanup: {}", owner.registered_count());
}
