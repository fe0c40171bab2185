use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use provdag::task::{Action, ActionFuture, ActionOutput, TaskNode};

/// What a [`FakeAction`] does when invoked.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Succeed,
    Fail(String),
    /// Never completes; only a timeout gets rid of it.
    Hang,
    Panic,
    /// Succeeds after sleeping.
    Sleep(Duration),
}

/// Shared record of invocation order across several fake actions.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: &str) {
        self.0.lock().unwrap().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Tracks how many fake actions are running at once.
#[derive(Debug, Clone, Default)]
pub struct Concurrency {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Concurrency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn enter(&self) -> ActiveGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveGuard(Arc::clone(&self.active))
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scriptable in-process action for executor tests.
#[derive(Debug, Clone)]
pub struct FakeAction {
    name: String,
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
    journal: Option<Journal>,
    concurrency: Option<Concurrency>,
}

impl FakeAction {
    pub fn new(name: &str, behaviour: Behaviour) -> Self {
        Self {
            name: name.to_string(),
            behaviour,
            calls: Arc::new(AtomicUsize::new(0)),
            journal: None,
            concurrency: None,
        }
    }

    pub fn succeed(name: &str) -> Self {
        Self::new(name, Behaviour::Succeed)
    }

    pub fn fail(name: &str, detail: &str) -> Self {
        Self::new(name, Behaviour::Fail(detail.to_string()))
    }

    pub fn hang(name: &str) -> Self {
        Self::new(name, Behaviour::Hang)
    }

    pub fn panic(name: &str) -> Self {
        Self::new(name, Behaviour::Panic)
    }

    pub fn sleep(name: &str, d: Duration) -> Self {
        Self::new(name, Behaviour::Sleep(d))
    }

    pub fn journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn concurrency(mut self, tracker: &Concurrency) -> Self {
        self.concurrency = Some(tracker.clone());
        self
    }

    /// Handle on the invocation counter; stays valid after the action is
    /// moved into a node.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Wrap into a task node with no dependencies.
    pub fn node(self) -> TaskNode {
        let name = self.name.clone();
        TaskNode::new(name, Arc::new(self))
    }
}

impl Action for FakeAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self) -> ActionFuture<'_> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(journal) = &self.journal {
                journal.push(&self.name);
            }
            let _active = self.concurrency.as_ref().map(Concurrency::enter);

            match &self.behaviour {
                Behaviour::Succeed => ActionOutput::succeeded(),
                Behaviour::Fail(detail) => ActionOutput::failed(detail.clone()),
                Behaviour::Hang => std::future::pending::<ActionOutput>().await,
                Behaviour::Panic => panic!("fake action '{}' panicked", self.name),
                Behaviour::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    ActionOutput::succeeded()
                }
            }
        })
    }
}
