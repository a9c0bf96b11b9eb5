//! Getting maps in and out: the binary codec, map files and the HTTP endpoint.

pub mod mapfile;
pub mod server;
pub mod wire;

pub use mapfile::{collect_inputs, planned_path, read_map, write_map};
pub use server::{start_server, ServerState};
pub use wire::{decode_map, decode_request, encode_map, WireMap, WireTile, UNOWNED};
