/// Track lifecycle states.
///
/// An Active track is demoted to `Lost` at the start of each cycle and
/// promoted back on a successful match, so "Active" always means "matched
/// this frame". A track that stays unmatched remains `Lost` across cycles,
/// coasting on its predicted motion, until it is re-matched or ages out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackStatus {
    /// Newly spawned track, not yet confirmed by `min_hits` matches.
    #[default]
    Tentative,
    /// Confirmed and matched this frame.
    Active,
    /// Previously Active and currently unmatched; kept in the live set and
    /// eligible to re-match until `max_age` frames pass without a hit.
    Lost,
    /// Aged out; evicted from the live set at the end of the cycle.
    Removed,
}
