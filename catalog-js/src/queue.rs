use parking_lot::Condvar;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

/// Default probe parallelism: hardware parallelism minus one, floor 1. One
/// core is left for the thread blocked on the bridge.
pub fn max_concurrency() -> usize {
  let cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
  cpus.saturating_sub(1).max(1)
}

type Task<E> = Box<dyn FnOnce() -> Result<(), E> + Send + 'static>;

struct State<E> {
  pending: VecDeque<Task<E>>,
  // Worker threads currently alive (running a task or about to pull one).
  workers: usize,
  first_error: Option<E>,
}

struct Shared<E> {
  state: Mutex<State<E>>,
  settled: Condvar,
}

/// Bounded-parallelism FIFO task scheduler. Up to `limit` tasks run
/// concurrently; the rest wait in submission order. There is no
/// deduplication, no priority and no retry, and a failure cancels nothing:
/// every submitted task still runs, `wait` merely reports the first
/// failure once the queue drains.
pub struct TaskQueue<E> {
  shared: Arc<Shared<E>>,
  limit: usize,
}

impl<E: Send + 'static> TaskQueue<E> {
  pub fn new(limit: usize) -> Self {
    TaskQueue {
      shared: Arc::new(Shared {
        state: Mutex::new(State {
          pending: VecDeque::new(),
          workers: 0,
          first_error: None,
        }),
        settled: Condvar::new(),
      }),
      limit: limit.max(1),
    }
  }

  pub fn enqueue(&self, task: Task<E>) {
    let mut state = self.shared.state.lock();
    state.pending.push_back(task);
    if state.workers < self.limit {
      state.workers += 1;
      drop(state);
      let shared = Arc::clone(&self.shared);
      thread::spawn(move || Self::drain(shared));
    }
  }

  // Worker loop: pull the next queued task until the queue is empty, then
  // wind down. A freed slot therefore always services the oldest waiter.
  fn drain(shared: Arc<Shared<E>>) {
    loop {
      let task = {
        let mut state = shared.state.lock();
        match state.pending.pop_front() {
          Some(task) => task,
          None => {
            state.workers -= 1;
            if state.workers == 0 {
              shared.settled.notify_all();
            }
            return;
          }
        }
      };
      let outcome = task();
      if let Err(err) = outcome {
        let mut state = shared.state.lock();
        if state.first_error.is_none() {
          state.first_error = Some(err);
        }
      }
    }
  }

  /// Blocks until every enqueued task has settled. Returns the first
  /// failure, if any task failed.
  pub fn wait(&self) -> Result<(), E> {
    let mut state = self.shared.state.lock();
    while state.workers > 0 || !state.pending.is_empty() {
      self.shared.settled.wait(&mut state);
    }
    match state.first_error.take() {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }
}
