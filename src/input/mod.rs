// SPDX-License-Identifier: Apache-2.0

mod file_id;
mod framer;

pub use file_id::{FileId, get_path_from_file, inode};
pub use framer::{LineFramer, MIN_BUFFER_SIZE};
