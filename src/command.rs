//! Memcached command catalog.
//!
//! The fixed set of client commands this crate intercepts. Every variant
//! corresponds to one method on [`MemcachedCommands`](crate::MemcachedCommands),
//! and its lowercase name is what shows up in the `db.statement` span attribute.

use std::fmt;

/// A memcached client command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Store a value unconditionally.
    Set,
    /// Store several values in one call.
    SetMany,
    /// Store only if the key does not exist yet.
    Add,
    /// Store only if the key already exists.
    Replace,
    /// Append bytes to an existing value.
    Append,
    /// Prepend bytes to an existing value.
    Prepend,
    /// Compare-and-swap store guarded by a cas token.
    Cas,
    /// Fetch a single value.
    Get,
    /// Fetch several values in one call.
    GetMany,
    /// Fetch a value together with its cas token.
    Gets,
    /// Fetch several values together with their cas tokens.
    GetsMany,
    /// Remove a single key.
    Delete,
    /// Remove several keys in one call.
    DeleteMany,
    /// Increment a numeric value.
    Incr,
    /// Decrement a numeric value.
    Decr,
    /// Update the expiration of a key without touching its value.
    Touch,
    /// Fetch server statistics.
    Stats,
    /// Fetch the server version string.
    Version,
    /// Invalidate the entire cache.
    FlushAll,
    /// Close the connection.
    Quit,
    /// Alias some clients expose for [`Command::SetMany`].
    SetMulti,
    /// Alias some clients expose for [`Command::GetMany`].
    GetMulti,
}

impl Command {
    /// All intercepted commands, for iteration.
    pub const ALL: [Command; 22] = [
        // Storage
        Command::Set,
        Command::SetMany,
        Command::Add,
        Command::Replace,
        Command::Append,
        Command::Prepend,
        Command::Cas,
        // Retrieval
        Command::Get,
        Command::GetMany,
        Command::Gets,
        Command::GetsMany,
        // Deletion
        Command::Delete,
        Command::DeleteMany,
        // Counters
        Command::Incr,
        Command::Decr,
        Command::Touch,
        // Admin
        Command::Stats,
        Command::Version,
        Command::FlushAll,
        Command::Quit,
        // Aliases
        Command::SetMulti,
        Command::GetMulti,
    ];

    /// The client method name, as rendered into span attributes.
    pub const fn as_str(self) -> &'static str {
        match self {
            Command::Set => "set",
            Command::SetMany => "set_many",
            Command::Add => "add",
            Command::Replace => "replace",
            Command::Append => "append",
            Command::Prepend => "prepend",
            Command::Cas => "cas",
            Command::Get => "get",
            Command::GetMany => "get_many",
            Command::Gets => "gets",
            Command::GetsMany => "gets_many",
            Command::Delete => "delete",
            Command::DeleteMany => "delete_many",
            Command::Incr => "incr",
            Command::Decr => "decr",
            Command::Touch => "touch",
            Command::Stats => "stats",
            Command::Version => "version",
            Command::FlushAll => "flush_all",
            Command::Quit => "quit",
            Command::SetMulti => "set_multi",
            Command::GetMulti => "get_multi",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_commands_unique() {
        let mut seen = std::collections::HashSet::new();
        for command in Command::ALL {
            assert!(seen.insert(command.as_str()), "Duplicate command: {}", command);
        }
    }

    #[test]
    fn test_command_count() {
        // One variant per client method, aliases included
        assert_eq!(Command::ALL.len(), 22);
    }

    #[test]
    fn test_display_matches_method_name() {
        assert_eq!(Command::Set.to_string(), "set");
        assert_eq!(Command::GetsMany.to_string(), "gets_many");
        assert_eq!(Command::FlushAll.to_string(), "flush_all");
        assert_eq!(Command::SetMulti.to_string(), "set_multi");
    }
}
