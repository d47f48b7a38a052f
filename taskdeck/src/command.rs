//! Command dispatch between the TUI loop and the async services.
//!
//! The poll-based TUI loop cannot await, so user actions are turned into
//! [`AppCommand`]s and sent over a channel to a background task that runs
//! them against the [`Services`]. Results flow back to the TUI indirectly:
//! notices on the notice channels, task changes through the store's
//! revision counter and session changes through the auth-state channel.
//!
//! ```text
//! TUI (main thread)  ─── AppCommand ──→  command handler task
//!                    ←── notices / revisions / auth state ───
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;

use taskdeck_model::task::{NewSubtask, NewTask, SubtaskId, TaskId, TaskPatch};

use crate::auth::{AuthFailure, Authenticator, LoginForm, RegisterForm, ResetForm};
use crate::backend::{DocumentStore, IdentityProvider};
use crate::store::TaskStore;
use crate::theme::{PreferenceStore, ThemeController};

/// Requests from the TUI to the services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Sign in with email and password.
    SignIn(LoginForm),
    /// Register a new account.
    SignUp(RegisterForm),
    /// Sign in through the Google popup flow.
    SignInWithGoogle,
    /// Send a password reset email.
    SendPasswordReset(ResetForm),
    /// End the session.
    SignOut,
    /// Create a task.
    AddTask(NewTask),
    /// Apply a patch to a task.
    UpdateTask {
        /// Task to change.
        task: TaskId,
        /// Fields to change.
        patch: TaskPatch,
    },
    /// Delete a task.
    DeleteTask(TaskId),
    /// Flip a task's completion flag.
    ToggleTask(TaskId),
    /// Append a subtask.
    AddSubtask {
        /// Parent task.
        task: TaskId,
        /// The new subtask.
        subtask: NewSubtask,
    },
    /// Flip a subtask's completion flag.
    ToggleSubtask {
        /// Parent task.
        task: TaskId,
        /// Subtask to flip.
        subtask: SubtaskId,
    },
    /// Remove a subtask.
    DeleteSubtask {
        /// Parent task.
        task: TaskId,
        /// Subtask to remove.
        subtask: SubtaskId,
    },
    /// Switch between light and dark.
    ToggleTheme,
    /// Stop the command handler.
    Shutdown,
}

/// Everything a command can act on.
pub struct Services<P: IdentityProvider, D: DocumentStore, T: PreferenceStore> {
    /// Auth flows.
    pub auth: Authenticator<P>,
    /// The user's tasks.
    pub store: Arc<TaskStore<D>>,
    /// Theme preference.
    pub theme: ThemeController<T>,
}

impl<P: IdentityProvider, D: DocumentStore, T: PreferenceStore> Services<P, D, T> {
    /// Runs one command to completion.
    ///
    /// Failures are already logged and reported as notices by the service
    /// that raised them, so nothing is returned.
    pub async fn execute(&self, command: AppCommand) {
        tracing::debug!(?command, "executing command");
        match command {
            AppCommand::SignIn(form) => log_auth(self.auth.sign_in(&form).await.map(drop)),
            AppCommand::SignUp(form) => log_auth(self.auth.sign_up(&form).await.map(drop)),
            AppCommand::SignInWithGoogle => {
                log_auth(self.auth.sign_in_with_google().await.map(drop));
            }
            AppCommand::SendPasswordReset(form) => {
                log_auth(self.auth.send_password_reset(&form).await);
            }
            AppCommand::SignOut => log_auth(self.auth.sign_out().await),
            AppCommand::AddTask(task) => {
                let _ = self.store.add_task(task).await;
            }
            AppCommand::UpdateTask { task, patch } => {
                let _ = self.store.update_task(&task, patch).await;
            }
            AppCommand::DeleteTask(task) => {
                let _ = self.store.delete_task(&task).await;
            }
            AppCommand::ToggleTask(task) => {
                let _ = self.store.toggle_task_complete(&task).await;
            }
            AppCommand::AddSubtask { task, subtask } => {
                let _ = self.store.add_subtask(&task, subtask).await;
            }
            AppCommand::ToggleSubtask { task, subtask } => {
                let _ = self.store.toggle_subtask_complete(&task, &subtask).await;
            }
            AppCommand::DeleteSubtask { task, subtask } => {
                let _ = self.store.delete_subtask(&task, &subtask).await;
            }
            AppCommand::ToggleTheme => {
                self.theme.toggle();
            }
            AppCommand::Shutdown => {}
        }
    }
}

fn log_auth(result: Result<(), AuthFailure>) {
    // Provider failures were reported by the authenticator; form failures
    // are shown inline by the TUI before a command is ever sent.
    if let Err(AuthFailure::Form(err)) = result {
        tracing::debug!(error = %err, "auth form rejected");
    }
}

/// Spawns the command handler and returns the sending half of its channel.
///
/// Commands run one at a time in the order they were sent. The handler
/// stops on [`AppCommand::Shutdown`] or when every sender is dropped.
pub fn spawn_commands<P, D, T>(
    services: Arc<Services<P, D, T>>,
    buffer: usize,
) -> (mpsc::Sender<AppCommand>, tokio::task::JoinHandle<()>)
where
    P: IdentityProvider + 'static,
    D: DocumentStore + 'static,
    T: PreferenceStore + 'static,
{
    let (tx, rx) = mpsc::channel(buffer);
    let handle = tokio::spawn(command_handler(services, rx));
    (tx, handle)
}

async fn command_handler<P, D, T>(
    services: Arc<Services<P, D, T>>,
    mut rx: mpsc::Receiver<AppCommand>,
) where
    P: IdentityProvider,
    D: DocumentStore,
    T: PreferenceStore,
{
    while let Some(command) = rx.recv().await {
        if command == AppCommand::Shutdown {
            tracing::info!("command handler shutting down");
            break;
        }
        services.execute(command).await;
    }
}
