//! Front-end facing client for the task service.
//!
//! A [`TaskClient`] is either backed by the REST API ([`HttpTaskClient`]) or
//! simulated in memory ([`DemoTaskClient`]); [`ClientMode`] picks one. The
//! session is passed in as a [`SessionStore`].

pub mod session;
pub mod task_client;

pub use session::{
    FileSessionStore, InMemorySessionStore, Session, SessionError, SessionStore, UserProfile,
};
pub use task_client::{
    ClientError, ClientMode, DEFAULT_API_URL, DEMO_OWNER_ID, DemoTaskClient, HttpTaskClient,
    TaskClient, build_client, demo_chat_reply,
};
