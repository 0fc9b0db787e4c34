//! In-memory request state, local preferences and saved sessions

mod local_store;
mod partial_responses;
mod request_table;
mod snapshot;

pub use local_store::{
    mock_route_list_key, LocalStore, MOCK_ROUTE_LIST_KEY, RESPONSE_BODY_FORMAT_KEY,
};
pub use partial_responses::{assemble_if_complete, combine_base64_chunks, PartialResponses};
pub use request_table::RequestTable;
pub use snapshot::PersistedState;
