//! Error type shared by the stores, the board and the capability mocks.

/// Everything a board operation can fail with.
///
/// Store-level lookups that miss (an unknown job or application id) are
/// silent no-ops inside the stores; `NotFound` is only raised by the board
/// when a command names a record that has to exist.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Sign-up with an email that is already registered.
    #[error("User with this email already exists")]
    DuplicateUser,

    /// Sign-in with an unknown email or a mismatched password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No wallet capability is available in this environment.
    #[error("No wallet provider detected. Install a wallet to connect.")]
    NoWalletProvider,

    /// The wallet provider answered without any account.
    #[error("No accounts returned. Please try again.")]
    NoAccounts,

    /// A required form field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The operation needs a signed-in user.
    #[error("Please sign in to {0}")]
    NotSignedIn(&'static str),

    /// The operation needs a connected wallet.
    #[error("Connect your wallet to {0}")]
    WalletNotConnected(&'static str),

    #[error("{kind} #{id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// Only the user who posted a job may change it or decide on its applications.
    #[error("You are not authorized to change job #{0}")]
    NotJobOwner(i64),

    #[error("Database not initialized. Run 'jobboard init' first.")]
    NotInitialized,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = BoardError> = std::result::Result<T, E>;
