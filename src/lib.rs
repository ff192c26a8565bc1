//! Rift text core: block-list storage, cursors and branching undo
//!
//! Documents live in a [`block::BlockList`], are read and navigated through
//! [`block::BlockIter`] cursors, and are edited through [`buffer::Buffer`],
//! which records every change in a [`history::ChangeTree`].

pub mod block;
pub mod buffer;
pub mod character;
pub mod constants;
pub mod error;
pub mod history;
pub mod settings;
