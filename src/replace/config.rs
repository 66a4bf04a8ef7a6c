use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::Rng;

use super::error::Error;
use crate::search::Search;

/// Options controlling which match sites are replaced and how.
///
/// `loc` and `ori` are 1-based on this surface; an orientation of `0` means
/// "pick the orientation minimizing the alignment RMSD at that location".
#[derive(Debug, Clone)]
pub struct ReplaceConfig {
    /// Pick orientations uniformly at random per selected location.
    pub random: bool,
    /// Number of locations to sample without replacement; `0` means unset.
    pub nb_loc: usize,
    /// Explicit location indices (1-based).
    pub loc: Vec<usize>,
    /// Orientation indices paired with `loc` (1-based; `0` = optimal).
    pub ori: Vec<usize>,
    /// Name assigned to the produced crystal.
    pub name: String,
    /// RNG seed for the random schemes; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Emit progress messages at `info` level instead of `debug`.
    pub verbose: bool,
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            random: false,
            nb_loc: 0,
            loc: Vec::new(),
            ori: Vec::new(),
            name: "new_xtal".to_string(),
            seed: None,
            verbose: false,
        }
    }
}

/// Resolves a configuration against a search into concrete
/// `(location, orientation)` pairs, 0-based, with `None` standing for the
/// RMSD-optimal orientation.
pub(crate) fn resolve_scheme(
    search: &Search,
    config: &ReplaceConfig,
    rng: &mut StdRng,
) -> Result<Vec<(usize, Option<usize>)>, Error> {
    let n = search.nb_locations();

    if !config.ori.is_empty() && config.loc.is_empty() {
        return Err(Error::invalid_scheme("`ori` requires `loc`"));
    }
    if !config.loc.is_empty() && config.nb_loc > 0 {
        return Err(Error::invalid_scheme("`loc` and `nb_loc` are exclusive"));
    }
    if config.nb_loc > n {
        return Err(Error::invalid_scheme(format!(
            "cannot sample {} of {} locations",
            config.nb_loc, n
        )));
    }

    let locations = if !config.loc.is_empty() {
        let mut seen = HashSet::new();
        let mut picked = Vec::with_capacity(config.loc.len());
        for &l in &config.loc {
            if l == 0 || l > n {
                return Err(Error::invalid_scheme(format!(
                    "location {} out of range 1..={}",
                    l, n
                )));
            }
            if config.ori.is_empty() && !seen.insert(l) {
                return Err(Error::invalid_scheme(format!("duplicate location {}", l)));
            }
            picked.push(l - 1);
        }
        picked
    } else if config.nb_loc > 0 {
        let mut sampled = rand::seq::index::sample(rng, n, config.nb_loc).into_vec();
        sampled.sort_unstable();
        sampled
    } else {
        (0..n).collect()
    };

    if config.ori.is_empty() {
        return Ok(locations
            .into_iter()
            .map(|l| {
                let ori = config
                    .random
                    .then(|| rng.random_range(0..search.nb_orientations(l)));
                (l, ori)
            })
            .collect());
    }

    if config.ori.len() != config.loc.len() {
        return Err(Error::invalid_scheme(format!(
            "{} locations but {} orientations",
            config.loc.len(),
            config.ori.len()
        )));
    }

    let mut seen = HashSet::new();
    let mut configs = Vec::with_capacity(locations.len());
    for (&l, &o) in locations.iter().zip(&config.ori) {
        let ori = match o {
            0 => None,
            _ if o > search.nb_orientations(l) => {
                return Err(Error::invalid_scheme(format!(
                    "orientation {} out of range 1..={} at location {}",
                    o,
                    search.nb_orientations(l),
                    l + 1
                )));
            }
            _ => Some(o - 1),
        };
        if !seen.insert((l, o)) {
            return Err(Error::invalid_scheme(format!(
                "duplicate configuration (loc {}, ori {})",
                l + 1,
                o
            )));
        }
        configs.push((l, ori));
    }
    Ok(configs)
}
