//! Fee-approval prompting.
//!
//! The terminal read runs on a detached thread; an abandoned read never
//! delays runtime shutdown.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Mutex;

use async_trait::async_trait;

/// Asks the operator a yes/no question.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Interactive `[y/N]` prompt on the terminal. Defaults to no.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmer;

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        ask_detached(move || ask(&prompt, std::io::stdin().lock(), std::io::stdout())).await
    }
}

/// Run a blocking question on its own thread and await the answer.
///
/// Dropping the returned future leaves the thread behind; nothing joins it.
async fn ask_detached<F>(question: F) -> bool
where
    F: FnOnce() -> bool + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name("fee-prompt".to_string())
        .spawn(move || {
            let _ = tx.send(question());
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "Failed to start prompt thread");
        return false;
    }
    rx.await.unwrap_or(false)
}

fn ask<R: BufRead, W: Write>(prompt: &str, mut input: R, mut output: W) -> bool {
    loop {
        let _ = write!(output, "{} [y/N]: ", prompt);
        let _ = output.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        if let Some(answer) = parse_answer(&line) {
            return answer;
        }
    }
}

/// `y...` is yes, `n...` or an empty line is no, anything else asks again.
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_lowercase().chars().next() {
        Some('y') => Some(true),
        Some('n') | None => Some(false),
        Some(_) => None,
    }
}

/// Approves without asking (`--noprompt`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl Confirmer for AutoApprove {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Replays canned answers and records the prompts it was shown.
///
/// Answers `false` once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedConfirmer {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y\n"), Some(true));
        assert_eq!(parse_answer("Yes"), Some(true));
        assert_eq!(parse_answer("n"), Some(false));
        assert_eq!(parse_answer("\n"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
    }

    #[test]
    fn test_ask_repeats_until_understood() {
        let mut output = Vec::new();
        assert!(ask("Continue?", &b"maybe\nyes\n"[..], &mut output));
        assert_eq!(String::from_utf8(output).unwrap(), "Continue? [y/N]: Continue? [y/N]: ");
        assert!(!ask("Continue?", &b""[..], Vec::new()));
    }

    #[tokio::test]
    async fn test_detached_answer_is_returned() {
        assert!(ask_detached(|| true).await);
        assert!(!ask_detached(|| false).await);
    }

    #[test]
    fn test_abandoned_prompt_does_not_block_runtime_shutdown() {
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        let (keep_blocked, blocked) = std::sync::mpsc::channel::<()>();

        let answer = runtime.block_on(async move {
            tokio::select! {
                answer = ask_detached(move || blocked.recv().is_ok()) => Some(answer),
                _ = tokio::time::sleep(Duration::from_millis(50)) => None,
            }
        });
        assert_eq!(answer, None);

        let started = Instant::now();
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(keep_blocked);
    }

    #[tokio::test]
    async fn test_scripted_answers() {
        let confirmer = ScriptedConfirmer::new([true]);
        assert!(confirmer.confirm("first?").await);
        assert!(!confirmer.confirm("second?").await);
        assert_eq!(confirmer.prompts(), vec!["first?".to_string(), "second?".to_string()]);
    }

    #[tokio::test]
    async fn test_auto_approve() {
        assert!(AutoApprove.confirm("anything").await);
    }
}
