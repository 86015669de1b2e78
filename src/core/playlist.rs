//! Playlist selector.
//!
//! Every unseen movie plus the first unseen episode of each series, in
//! random order.

use crate::models::catalog::Catalog;
use crate::models::playlist::PlaylistItem;
use rand::seq::SliceRandom;

/// Items eligible to play, in deterministic order: movies by path, then one
/// episode per series by series name.
pub fn eligible_items(catalog: &Catalog) -> Vec<PlaylistItem> {
    let mut items: Vec<PlaylistItem> = catalog
        .movies
        .iter()
        .filter(|movie| movie.watch.is_unseen())
        .map(PlaylistItem::from_movie)
        .collect();

    for (series, episodes) in &catalog.series {
        let mut ordered: Vec<_> = episodes.iter().collect();
        ordered.sort_by(|a, b| a.order_key().cmp(&b.order_key()));

        // Later episodes wait until this one is watched.
        if let Some(next) = ordered.into_iter().find(|ep| ep.watch.is_unseen()) {
            items.push(PlaylistItem::from_episode(series, next));
        }
    }

    items
}

/// Select the playlist for a session. An empty result means there is
/// nothing left to watch.
pub fn select_playlist(catalog: &Catalog) -> Vec<PlaylistItem> {
    let mut items = eligible_items(catalog);
    items.shuffle(&mut rand::rng());

    tracing::info!("Playlist built with {} items", items.len());
    items
}
