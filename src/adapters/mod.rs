//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements        | Connects to                      |
//! |-----------------|-------------------|----------------------------------|
//! | `file_storage`  | StoragePort       | One JSON file per key on disk    |
//! | `memory`        | StoragePort       | In-process map (tests, dry runs) |
//! | `time`          | Clock             | System wall clock                |
//! | `log_sink`      | EventSink         | `log` facade                     |
//! | `operator_gate` | OperatorGate      | Shared operator key (HMAC)       |
//! | `http_api`      | (none)            | axum router over GateService     |
//! | `http_client`   | CommandTransport  | Blocking reqwest POST            |
//! | `heartbeat`     | (none)            | External liveness endpoint       |

pub mod file_storage;
pub mod heartbeat;
pub mod http_api;
pub mod http_client;
pub mod log_sink;
pub mod memory;
pub mod operator_gate;
pub mod time;
