/*****************************************************************************************[jobqueue.rs]
Copyright (c) 2003-2006, Niklas Een, Niklas Sorensson (MiniSat)
Copyright (c) 2007-2010, Niklas Sorensson (MiniSat)
Copyright (c) 2018-2018, Masaki Hara

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute,
sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or
substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT
OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
**************************************************************************************************/

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

/// Blocks threads until a predefined number of them reached a given point.
///
/// Reusable with no reset step: two alternating phases share one counter.
/// While counting down each arrival decrements it; the arrival that reaches
/// zero flips the phase and wakes all sleepers. The next cycle counts up to
/// the capacity again, so there is no "who resets?" race between cycles.
pub struct Barrier {
    m: Mutex<BarrierState>,
    cond: Condvar,
}

struct BarrierState {
    /// Arrivals still owed while counting down; arrivals seen while counting up.
    nb_threads: usize,
    /// Expected arrivals per cycle.
    capacity: usize,
    count_down: bool,
}

impl Barrier {
    pub fn new(nb_threads: usize) -> Self {
        Self {
            m: Mutex::new(BarrierState {
                nb_threads,
                capacity: nb_threads,
                count_down: true,
            }),
            cond: Condvar::new(),
        }
    }

    /// Wait here until the predefined number of threads have arrived.
    pub fn wait(&self) {
        self.wait_then(|| {});
    }

    /// Like [`wait`](Self::wait), but the arrival that completes the cycle
    /// runs `on_release` under the barrier lock before waking the sleepers.
    /// Every thread released by this cycle observes the effects of
    /// `on_release`, which makes it possible to publish a per-cycle decision
    /// consistently to all participants.
    pub fn wait_then<F: FnOnce()>(&self, on_release: F) {
        let mut st = self.m.lock().unwrap();

        if st.count_down {
            debug_assert!(st.nb_threads != 0);
            st.nb_threads -= 1;
            if st.nb_threads == 0 {
                st.count_down = false;
                on_release();
                self.cond.notify_all();
            } else {
                while st.count_down {
                    st = self.cond.wait(st).unwrap();
                }
            }
        } else {
            debug_assert!(st.capacity != 0);
            st.nb_threads += 1;
            if st.nb_threads == st.capacity {
                st.count_down = true;
                on_release();
                self.cond.notify_all();
            } else {
                while !st.count_down {
                    st = self.cond.wait(st).unwrap();
                }
            }
        }
    }

    /// Allow a greater number of threads to be blocked; returns success.
    /// Shrinking is not supported.
    pub fn grow(&self, new_capacity: usize) -> bool {
        let mut st = self.m.lock().unwrap();
        if new_capacity < st.capacity {
            return false;
        }
        // while counting down, the in-progress cycle still owes the delta
        if st.count_down {
            st.nb_threads += new_capacity - st.capacity;
        }
        st.capacity = new_capacity;
        debug_assert!(st.capacity >= st.nb_threads);
        true
    }

    /// How many threads still need to arrive before all are released.
    pub fn remaining(&self) -> usize {
        let st = self.m.lock().unwrap();
        if st.count_down {
            st.nb_threads
        } else {
            st.capacity - st.nb_threads
        }
    }

    /// Whether currently no thread is blocked in this barrier.
    pub fn empty(&self) -> bool {
        let st = self.m.lock().unwrap();
        let remaining = if st.count_down {
            st.nb_threads
        } else {
            st.capacity - st.nb_threads
        };
        remaining == st.capacity
    }

    pub fn capacity(&self) -> usize {
        self.m.lock().unwrap().capacity
    }
}

impl Drop for Barrier {
    fn drop(&mut self) {
        debug_assert!(self.empty(), "do not destruct with sleeping threads");
    }
}

/// Counting semaphore; a post before the wait is not lost.
struct Semaphore {
    count: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    fn new() -> Self {
        Self {
            count: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    fn post(&self) {
        let mut c = self.count.lock().unwrap();
        *c += 1;
        self.cond.notify_one();
    }

    fn wait(&self) {
        let mut c = self.count.lock().unwrap();
        while *c == 0 {
            c = self.cond.wait(c).unwrap();
        }
        *c -= 1;
    }
}

/// A job is an opaque unit of work pulled from the FIFO by a pool thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pool of worker threads executing jobs from a FIFO, with a coordinated
/// sleep / work / terminate state machine.
///
/// On `SLEEP -> WORKING` all per-thread states are written before the
/// threads are woken, so no wakeup races with a stale state. `TERMINATE`
/// additionally wakes everyone so the threads can exit and be joined.
pub struct JobQueue {
    state: Arc<QueueState>,
    threads: Vec<thread::JoinHandle<()>>,
}

pub const SLEEP: i32 = 0;
pub const WORKING: i32 = 1;
pub const TERMINATE: i32 = -1;

struct QueueState {
    fifo: Mutex<VecDeque<Job>>,
    work_state: AtomicI32,
    thread_state: Vec<AtomicI32>,
    sleep_sem: Vec<Semaphore>,
    current_worker_number: AtomicUsize,
}

impl QueueState {
    fn wake_up_all(&self) {
        for s in &self.sleep_sem {
            s.post();
        }
    }

    fn set_state(&self, state: i32) {
        if self.work_state.load(Ordering::SeqCst) == SLEEP && state == WORKING {
            self.work_state.store(WORKING, Ordering::SeqCst);
            // set all the thread states before waking the threads up, so a
            // woken thread never reads a stale global state
            for t in &self.thread_state {
                t.store(WORKING, Ordering::SeqCst);
            }
            self.wake_up_all();
        }
        self.work_state.store(state, Ordering::SeqCst);
    }

    fn get_next_job(&self) -> Option<Job> {
        self.fifo.lock().unwrap().pop_front()
    }

    fn run(&self) {
        let my_number = self.current_worker_number.fetch_add(1, Ordering::SeqCst);
        let sem = &self.sleep_sem[my_number];

        // keep the thread until the work state says terminate
        while self.work_state.load(Ordering::SeqCst) != TERMINATE {
            match self.get_next_job() {
                None => {
                    // nothing to do -> sleep
                    self.thread_state[my_number].store(SLEEP, Ordering::SeqCst);
                    sem.wait();
                    self.thread_state[my_number]
                        .store(self.work_state.load(Ordering::SeqCst), Ordering::SeqCst);
                }
                Some(job) => {
                    job();
                }
            }

            // check every round whether to stop or not
            if self.work_state.load(Ordering::SeqCst) == SLEEP {
                self.thread_state[my_number].store(SLEEP, Ordering::SeqCst);
                sem.wait();
                self.thread_state[my_number]
                    .store(self.work_state.load(Ordering::SeqCst), Ordering::SeqCst);
            }
        }
        self.thread_state[my_number].store(self.work_state.load(Ordering::SeqCst), Ordering::SeqCst);
    }
}

impl JobQueue {
    /// Create a job queue with `cpus` worker threads, initially sleeping.
    pub fn new(cpus: usize) -> Self {
        assert!(cpus > 0, "job queue needs at least one thread");
        let state = Arc::new(QueueState {
            fifo: Mutex::new(VecDeque::new()),
            work_state: AtomicI32::new(SLEEP),
            thread_state: (0..cpus).map(|_| AtomicI32::new(SLEEP)).collect(),
            sleep_sem: (0..cpus).map(|_| Semaphore::new()).collect(),
            current_worker_number: AtomicUsize::new(0),
        });
        let threads = (0..cpus)
            .map(|_| {
                let st = Arc::clone(&state);
                thread::spawn(move || st.run())
            })
            .collect();
        Self { state, threads }
    }

    /// Thread-safe FIFO push.
    pub fn add_job(&self, job: Job) {
        self.state.fifo.lock().unwrap().push_back(job);
    }

    /// Number of queued jobs.
    pub fn size(&self) -> usize {
        self.state.fifo.lock().unwrap().len()
    }

    pub fn set_state(&self, state: i32) {
        self.state.set_state(state);
    }

    pub fn get_state(&self) -> i32 {
        self.state.work_state.load(Ordering::SeqCst)
    }

    /// True iff no worker thread is currently working.
    pub fn all_sleeping(&self) -> bool {
        self.state
            .thread_state
            .iter()
            .all(|t| t.load(Ordering::SeqCst) != WORKING)
    }

    /// Terminate and join all threads.
    fn wait_terminate(&mut self) {
        self.state.set_state(TERMINATE);
        self.state.wake_up_all();
        for t in self.threads.drain(..) {
            let _ = t.join();
        }
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.wait_terminate();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_barrier_releases_all() {
        let barrier = Arc::new(Barrier::new(4));
        let hits = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];
        for _ in 0..3 {
            let b = Arc::clone(&barrier);
            let h = Arc::clone(&hits);
            handles.push(thread::spawn(move || {
                b.wait();
                h.fetch_add(1, Ordering::SeqCst);
            }));
        }
        thread::sleep(Duration::from_millis(50));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        barrier.wait();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(barrier.empty());
    }

    #[test]
    fn test_barrier_reusable() {
        let barrier = Arc::new(Barrier::new(2));
        let b = Arc::clone(&barrier);
        let t = thread::spawn(move || {
            for _ in 0..100 {
                b.wait();
            }
        });
        for _ in 0..100 {
            barrier.wait();
        }
        t.join().unwrap();
        assert!(barrier.empty());
    }

    #[test]
    fn test_barrier_grow() {
        let barrier = Barrier::new(0);
        assert!(barrier.grow(3));
        assert_eq!(barrier.capacity(), 3);
        assert!(!barrier.grow(1), "shrinking must fail");
        assert_eq!(barrier.remaining(), 3);
    }

    #[test]
    fn test_wait_then_decision_reaches_all() {
        // the completing arrival publishes a decision; every participant of
        // that cycle must observe it after release
        let barrier = Arc::new(Barrier::new(3));
        let decided = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];
        for _ in 0..3 {
            let b = Arc::clone(&barrier);
            let d = Arc::clone(&decided);
            let s = Arc::clone(&seen);
            handles.push(thread::spawn(move || {
                b.wait_then(|| {
                    d.store(42, Ordering::SeqCst);
                });
                if d.load(Ordering::SeqCst) == 42 {
                    s.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_jobqueue_runs_jobs() {
        let queue = JobQueue::new(2);
        let done = Arc::new(AtomicUsize::new(0));
        queue.set_state(SLEEP);
        for _ in 0..8 {
            let d = Arc::clone(&done);
            queue.add_job(Box::new(move || {
                d.fetch_add(1, Ordering::SeqCst);
            }));
        }
        queue.set_state(WORKING);
        let mut waited = 0;
        while done.load(Ordering::SeqCst) < 8 && waited < 2000 {
            thread::sleep(Duration::from_millis(5));
            waited += 5;
        }
        assert_eq!(done.load(Ordering::SeqCst), 8);
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn test_jobqueue_sleep_wake_cycle() {
        let queue = JobQueue::new(1);
        let done = Arc::new(AtomicUsize::new(0));
        for round in 1..4usize {
            queue.set_state(SLEEP);
            let d = Arc::clone(&done);
            queue.add_job(Box::new(move || {
                d.fetch_add(1, Ordering::SeqCst);
            }));
            queue.set_state(WORKING);
            let mut waited = 0;
            while done.load(Ordering::SeqCst) < round && waited < 2000 {
                thread::sleep(Duration::from_millis(5));
                waited += 5;
            }
            assert_eq!(done.load(Ordering::SeqCst), round);
        }
    }

    #[test]
    fn test_jobqueue_terminates() {
        let queue = JobQueue::new(3);
        drop(queue); // must not hang
    }
}
