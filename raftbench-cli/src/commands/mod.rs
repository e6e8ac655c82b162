pub mod bench;
pub mod cluster;

/// Report banner rule, shared by all subcommands.
pub const RULE: &str = "═══════════════════════════════════════════════════════════════";
pub const DASH: &str = "───────────────────────────────────────────────────────────────";
