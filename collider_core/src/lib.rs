pub mod collide;
pub mod config;
pub mod crc;
pub mod forge;
pub mod frame;
pub mod record;
pub mod solver;

pub use collide::{SearchSettings, Solution, run_search};
pub use config::ColliderConfig;
pub use crc::Crc64We;
pub use forge::{ForgeError, ForgedFrame, LinearSolver, file_name_bit_window, forge};
pub use frame::{FRAME_SIZE, Frame, compose_with_leading_crc, parse_with_trailing_crc};
pub use record::{ConfigRecord, FILE_NAME_LEN, RECORD_SIZE};
pub use solver::{GaussianSolver, SolverError};
