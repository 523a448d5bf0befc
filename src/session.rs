//! Session-factory boundary
//!
//! The CMIS session layer is an external collaborator. This module builds
//! the flat integer-keyed parameter map it consumes and forwards calls to a
//! [`SessionFactory`], returning every failure as a typed [`SessionError`].

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

/// Keys of the session parameter map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum SessionParam {
    AtomPubUrl = 0,
    RepositoryId = 1,
    Username = 2,
    Password = 3,
    Verbose = 4,
}

impl SessionParam {
    pub const ALL: [SessionParam; 5] = [
        SessionParam::AtomPubUrl,
        SessionParam::RepositoryId,
        SessionParam::Username,
        SessionParam::Password,
        SessionParam::Verbose,
    ];

    /// Integer key as the session layer sees it
    pub fn key(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for SessionParam {
    type Error = i32;

    fn try_from(key: i32) -> Result<Self, Self::Error> {
        SessionParam::ALL.into_iter().find(|p| p.key() == key).ok_or(key)
    }
}

/// Flat parameter map handed to the factory
pub type ParamMap = BTreeMap<SessionParam, String>;

/// Typed session configuration
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionParams {
    pub binding_url: String,
    pub repository_id: String,
    pub username: String,
    pub password: String,
    pub verbose: bool,
}

impl SessionParams {
    pub fn new(binding_url: impl Into<String>) -> Self {
        SessionParams {
            binding_url: binding_url.into(),
            ..Default::default()
        }
    }

    pub fn with_repository(mut self, repository_id: impl Into<String>) -> Self {
        self.repository_id = repository_id.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// All five keys; verbose maps to `"true"` or the empty string
    pub fn to_param_map(&self) -> ParamMap {
        BTreeMap::from([
            (SessionParam::AtomPubUrl, self.binding_url.clone()),
            (SessionParam::RepositoryId, self.repository_id.clone()),
            (SessionParam::Username, self.username.clone()),
            (SessionParam::Password, self.password.clone()),
            (
                SessionParam::Verbose,
                if self.verbose { "true" } else { "" }.to_string(),
            ),
        ])
    }
}

impl fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParams")
            .field("binding_url", &self.binding_url)
            .field("repository_id", &self.repository_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("verbose", &self.verbose)
            .finish()
    }
}

/// Failure reported by the session layer
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// CMIS fault returned by the repository (`permissionDenied`,
    /// `objectNotFound`, ...)
    #[error("CMIS {kind}: {message}")]
    Cmis { kind: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// External session/repository factory
pub trait SessionFactory {
    type Session;
    type Repository;

    fn create_session(&self, params: &ParamMap) -> Result<Self::Session, SessionError>;

    fn get_repositories(&self, params: &ParamMap) -> Result<Vec<Self::Repository>, SessionError>;
}

/// Repository handles with their real count; dropping the list drops
/// every handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryList<R> {
    items: Vec<R>,
}

impl<R> RepositoryList<R> {
    pub fn new(items: Vec<R>) -> Self {
        RepositoryList { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<R> {
        self.items
    }
}

impl<R> IntoIterator for RepositoryList<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, R> IntoIterator for &'a RepositoryList<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Open a session through `factory`
pub fn create_session<F: SessionFactory>(factory: &F, params: &SessionParams) -> Result<F::Session, SessionError> {
    debug!(url = %params.binding_url, repository = %params.repository_id, "creating session");
    factory
        .create_session(&params.to_param_map())
        .inspect_err(|err| debug!(error = %err, "session creation failed"))
}

/// List the repositories reachable with `params`
pub fn get_repositories<F: SessionFactory>(
    factory: &F,
    params: &SessionParams,
) -> Result<RepositoryList<F::Repository>, SessionError> {
    debug!(url = %params.binding_url, "listing repositories");
    let repositories = factory
        .get_repositories(&params.to_param_map())
        .inspect_err(|err| debug!(error = %err, "repository listing failed"))?;
    debug!(count = repositories.len(), "repositories listed");
    Ok(RepositoryList::new(repositories))
}
