use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, instrument};

use shared::{
    JudgeVerdict, NewSolutionResult, Problem, Solution, SolutionStatus, TaskTemplate,
    UpdateSolutionParams,
};

use crate::judge_client::{CreateSubmissionRequest, Judge, JudgeClient, JudgeError};
use crate::store::EvaluationStore;

pub struct DispatchedJob {
    pub solution: Solution,
    pub problem: Problem,
    pub template: TaskTemplate,
}

/// Fixed-size pool consuming dispatched jobs from a bounded channel. The
/// channel itself is the backpressure point.
pub struct WorkerPool {
    receiver: Arc<Mutex<mpsc::Receiver<DispatchedJob>>>,
    judge: Arc<dyn Judge>,
    store: Arc<dyn EvaluationStore>,
    worker_count: usize,
    queue_full_backoff: Duration,
}

impl WorkerPool {
    pub fn new(
        receiver: mpsc::Receiver<DispatchedJob>,
        judge: Arc<dyn Judge>,
        store: Arc<dyn EvaluationStore>,
        worker_count: usize,
        queue_full_backoff: Duration,
    ) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            judge,
            store,
            worker_count,
            queue_full_backoff,
        }
    }

    /// Spawns `worker_count` tasks sharing one receiver; each claims the
    /// next job with an uncontended lock/unlock around `recv`.
    pub fn spawn(self) {
        for id in 0..self.worker_count {
            let receiver = self.receiver.clone();
            let judge = self.judge.clone();
            let store = self.store.clone();
            let backoff = self.queue_full_backoff;
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };
                    match job {
                        Some(job) => evaluate(&judge, &store, job, backoff).await,
                        None => {
                            info!(worker_id = id, "worker pool channel closed, exiting");
                            break;
                        }
                    }
                }
            });
        }
    }
}

/// Runs every test case in order against the judge, stopping at the first
/// non-Accepted verdict (S4), and aggregates the solution's runtime/memory
/// as the values observed at the slowest executed test (S5).
#[instrument(skip(judge, store, job), fields(solution_id = %job.solution.id))]
async fn evaluate(
    judge: &Arc<dyn Judge>,
    store: &Arc<dyn EvaluationStore>,
    job: DispatchedJob,
    queue_full_backoff: Duration,
) {
    let DispatchedJob {
        solution,
        problem,
        template,
    } = job;

    let mut results = Vec::with_capacity(problem.test_cases.len());
    let mut max_runtime = 0.0_f64;
    let mut memory_at_max_runtime = 0_i32;
    let mut status = SolutionStatus::Completed;

    let mut ordered = problem.test_cases.clone();
    ordered.sort_by_key(|tc| tc.number);
    let source = wrap_source(&template, &solution.code);

    for test_case in &ordered {
        let submission = loop {
            let req = CreateSubmissionRequest {
                source_code: source.clone(),
                language_id: solution.language_id,
                stdin: test_case.input.clone(),
                expected_output: test_case.output.clone(),
                cpu_time_limit: problem.task.runtime_limit,
                memory_limit: problem.task.memory_limit,
            };
            match judge.create_submission(req).await {
                Ok(info) => break Some(info),
                Err(JudgeError::QueueFull) => {
                    JudgeClient::backoff(queue_full_backoff).await;
                    continue;
                }
                Err(e) => {
                    error!(error = %e, test_case_id = %test_case.id, "judge call failed");
                    break None;
                }
            }
        };

        // A hard judge failure stops evaluation without a result row for the
        // erroring call itself; an earlier test's results still get persisted.
        let Some(submission) = submission else {
            status = SolutionStatus::Error;
            break;
        };

        let verdict =
            JudgeVerdict::from_judge_id(submission.status).unwrap_or(JudgeVerdict::InternalError);

        if submission.time > max_runtime {
            max_runtime = submission.time;
            memory_at_max_runtime = submission.memory;
        }

        let is_accepted = verdict.is_success();
        results.push(NewSolutionResult {
            test_case_id: test_case.id,
            submission_token: submission.token,
            status: verdict,
            runtime: submission.time,
            memory: submission.memory,
            stdout: submission.stdout,
            stderr: submission.stderr,
        });

        if !is_accepted {
            status = SolutionStatus::Error;
            break;
        }
    }

    let mut update = UpdateSolutionParams::new(solution.id);
    update.status = Some(status);
    update.runtime = Some(max_runtime);
    update.memory = Some(memory_at_max_runtime);

    if let Err(e) = store.finish_solution(solution.id, results, update).await {
        error!(solution_id = %solution.id, error = %e, "failed to persist solution results");
    }
}

/// `src = solution.code + "\n" + template.wrapper`: the wrapper is a hidden
/// harness appended after the user's code, not a placeholder template.
fn wrap_source(template: &TaskTemplate, code: &str) -> String {
    if template.wrapper.is_empty() {
        return code.to_string();
    }
    format!("{code}\n{}", template.wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge_client::JudgeSubmissionInfo;
    use shared::{StoreError, Task, TestCase};
    use std::sync::Mutex as StdMutex;
    use uuid::Uuid;

    fn template(wrapper: &str) -> TaskTemplate {
        TaskTemplate {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            language_id: Uuid::new_v4(),
            template: String::new(),
            wrapper: wrapper.to_string(),
        }
    }

    #[test]
    fn wraps_when_wrapper_present() {
        let t = template("int main() { return solve(); }");
        assert_eq!(
            wrap_source(&t, "int solve() { return 0; }"),
            "int solve() { return 0; }\nint main() { return solve(); }"
        );
    }

    #[test]
    fn passes_through_when_wrapper_empty() {
        let t = template("");
        assert_eq!(wrap_source(&t, "return 0;"), "return 0;");
    }

    /// Returns `Accepted` with an ascending runtime for each call, except for
    /// ids listed in `reject_at` (0-based call index), which come back
    /// `WrongAnswer`.
    struct ScriptedJudge {
        verdicts: Vec<(i32, f64, i32)>,
        calls: StdMutex<usize>,
    }

    #[async_trait::async_trait]
    impl Judge for ScriptedJudge {
        async fn create_submission(
            &self,
            _req: CreateSubmissionRequest,
        ) -> Result<JudgeSubmissionInfo, JudgeError> {
            let mut calls = self.calls.lock().unwrap();
            let (status, time, memory) = self.verdicts[*calls];
            *calls += 1;
            Ok(JudgeSubmissionInfo {
                token: format!("tok-{calls}"),
                stdout: None,
                stderr: None,
                time,
                memory,
                status,
            })
        }
    }

    struct RecordingStore {
        problem: Problem,
        solution: Solution,
        finished: StdMutex<Option<(Vec<NewSolutionResult>, UpdateSolutionParams)>>,
    }

    #[async_trait::async_trait]
    impl EvaluationStore for RecordingStore {
        async fn problem_by_task_id(&self, _task_id: Uuid) -> Result<Problem, StoreError> {
            Ok(self.problem.clone())
        }

        async fn solution_by_id(&self, _id: Uuid) -> Result<Solution, StoreError> {
            Ok(self.solution.clone())
        }

        async fn update_solution(&self, _params: UpdateSolutionParams) -> Result<(), StoreError> {
            Ok(())
        }

        async fn finish_solution(
            &self,
            _solution_id: Uuid,
            results: Vec<NewSolutionResult>,
            update: UpdateSolutionParams,
        ) -> Result<(), StoreError> {
            *self.finished.lock().unwrap() = Some((results, update));
            Ok(())
        }
    }

    fn task() -> Task {
        Task {
            id: Uuid::new_v4(),
            number: 1,
            name: "t".into(),
            description: "".into(),
            category: "".into(),
            difficulty: "easy".into(),
            runtime_limit: 1.0,
            memory_limit: 65536,
        }
    }

    fn test_cases(n: usize) -> Vec<TestCase> {
        let task_id = Uuid::new_v4();
        (1..=n as i32)
            .map(|number| TestCase {
                id: Uuid::new_v4(),
                task_id,
                number,
                input: "".into(),
                output: "".into(),
            })
            .collect()
    }

    fn job(problem: &Problem) -> DispatchedJob {
        DispatchedJob {
            solution: Solution {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                task_id: problem.task.id,
                language_id: Uuid::new_v4(),
                code: "solution".into(),
                status: SolutionStatus::Testing,
                runtime: 0.0,
                memory: 0,
                submitted_at: chrono::Utc::now(),
            },
            problem: problem.clone(),
            template: template(""),
        }
    }

    #[tokio::test]
    async fn all_accepted_completes_with_peak_runtime_and_its_memory() {
        let problem = Problem {
            task: task(),
            task_templates: Vec::new(),
            test_cases: test_cases(3),
        };
        let judge: Arc<dyn Judge> = Arc::new(ScriptedJudge {
            verdicts: vec![(3, 0.1, 1000), (3, 0.5, 4000), (3, 0.2, 1500)],
            calls: StdMutex::new(0),
        });
        let store = Arc::new(RecordingStore {
            problem: problem.clone(),
            solution: job(&problem).solution,
            finished: StdMutex::new(None),
        });
        let store_dyn: Arc<dyn EvaluationStore> = store.clone();

        evaluate(&judge, &store_dyn, job(&problem), Duration::from_millis(1)).await;

        let (results, update) = store.finished.lock().unwrap().take().unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status.is_success()));
        assert_eq!(update.status, Some(SolutionStatus::Completed));
        assert_eq!(update.runtime, Some(0.5));
        assert_eq!(update.memory, Some(4000));
    }

    #[tokio::test]
    async fn first_failure_stops_and_marks_error() {
        let problem = Problem {
            task: task(),
            task_templates: Vec::new(),
            test_cases: test_cases(3),
        };
        let judge: Arc<dyn Judge> = Arc::new(ScriptedJudge {
            verdicts: vec![(3, 0.1, 1000), (4, 0.2, 1200), (3, 0.3, 1300)],
            calls: StdMutex::new(0),
        });
        let store = Arc::new(RecordingStore {
            problem: problem.clone(),
            solution: job(&problem).solution,
            finished: StdMutex::new(None),
        });
        let store_dyn: Arc<dyn EvaluationStore> = store.clone();

        evaluate(&judge, &store_dyn, job(&problem), Duration::from_millis(1)).await;

        let (results, update) = store.finished.lock().unwrap().take().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(update.status, Some(SolutionStatus::Error));
        assert_eq!(update.runtime, Some(0.2));
    }
}
