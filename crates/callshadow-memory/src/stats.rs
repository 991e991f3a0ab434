//! Pure statistics aggregation over a turn sequence

use callshadow_protocol::{ConversationStats, Turn};

/// Fold a turn sequence into aggregate counts. Stateless; usable both for
/// prompt enrichment and for monitoring endpoints outside the hot path.
///
/// Only live turns are counted: turns already folded into a summary are no
/// longer individually countable.
pub fn aggregate<'a, I>(turns: I) -> ConversationStats
where
    I: IntoIterator<Item = &'a Turn>,
{
    let mut stats = ConversationStats::default();
    for turn in turns {
        stats.record(turn);
    }
    stats
}
