//! Slug derivation and unique allocation.
//!
//! Uniqueness is decided by the store: [`SlugAllocator::claim`] hands each
//! candidate to an insert closure and moves on to the next suffix only when
//! the store rejects it as a duplicate slug. Two concurrent claims of the
//! same base therefore never both succeed with one slug.

use crate::app_config::SlugConfig;
use crate::constants::MAX_SLUG_LENGTH;
use crate::error::{Error, Result};
use crate::store::{StoreError, UniqueKey};
use rand::{distributions::Alphanumeric, Rng};
use std::future::Future;

/// Room kept at the end of a base slug for a `-N` suffix.
const SUFFIX_RESERVE: usize = 8;

/// Lowercase, hyphen-separated ASCII form of `name`.
///
/// Latin letters with diacritics fold to their base letter; every other
/// non-alphanumeric run becomes a single hyphen. May return an empty string.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(fold_char) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else if c != '\'' {
            pending_hyphen = true;
        }
    }

    truncate_slug(out)
}

fn truncate_slug(mut slug: String) -> String {
    let max = MAX_SLUG_LENGTH - SUFFIX_RESERVE;
    if slug.len() > max {
        slug.truncate(max);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

/// Fold one character to zero or more ASCII characters.
fn fold_char(c: char) -> Vec<char> {
    let folded: &str = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => "C",
        'ď' | 'đ' => "d",
        'Ď' | 'Đ' => "D",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => "E",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => "G",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => "I",
        'ł' | 'ĺ' | 'ļ' | 'ľ' => "l",
        'Ł' | 'Ĺ' | 'Ļ' | 'Ľ' => "L",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => "O",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'Ŕ' | 'Ŗ' | 'Ř' => "R",
        'ś' | 'ŝ' | 'ş' | 'š' => "s",
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => "S",
        'ţ' | 'ť' => "t",
        'Ţ' | 'Ť' => "T",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ź' | 'ż' | 'ž' => "z",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        _ => return vec![c],
    };
    folded.chars().collect()
}

/// Candidate `n` for a base: the base itself, then `base-1`, `base-2`, ...
fn candidate(base: &str, n: u32) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, n)
    }
}

/// Derives slugs and claims them against a unique store constraint.
#[derive(Debug, Clone)]
pub struct SlugAllocator {
    config: SlugConfig,
}

impl SlugAllocator {
    pub fn new(config: SlugConfig) -> Self {
        Self { config }
    }

    /// Slug base for a tag or category name; never empty.
    ///
    /// Names with no sluggable characters fall back to their ASCII
    /// alphanumerics, or the configured token, plus a random suffix.
    pub fn base_for_name(&self, name: &str) -> String {
        let slug = slugify(name);
        if !slug.is_empty() {
            return slug;
        }
        self.fallback_slug(name)
    }

    fn fallback_slug(&self, name: &str) -> String {
        let ascii: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let prefix = if ascii.is_empty() {
            self.config.fallback_token.clone()
        } else {
            ascii
        };

        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.config.random_suffix_len)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();

        truncate_slug(format!("{}-{}", prefix, suffix))
    }

    /// Probe-based allocation: the first candidate `exists` reports free.
    ///
    /// Only unique at the instant of the probe; writers should prefer
    /// [`SlugAllocator::claim`].
    pub async fn allocate<F, Fut>(&self, base: &str, mut exists: F) -> Result<String>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = std::result::Result<bool, StoreError>>,
    {
        for n in 0..=self.config.max_attempts {
            let slug = candidate(base, n);
            if !exists(slug.clone()).await? {
                log::debug!("Slug probe: {} is free", slug);
                return Ok(slug);
            }
            log::debug!("Slug probe: {} is taken", slug);
        }
        Err(self.exhausted(base))
    }

    /// Insert-driven allocation.
    ///
    /// `insert` is called with each candidate until the store accepts one.
    /// A duplicate-slug rejection advances to the next suffix. One transient
    /// failure is retried on the same candidate; anything else propagates.
    pub async fn claim<T, F, Fut>(&self, base: &str, mut insert: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
    {
        let mut retried_transient = false;
        let mut n = 0;

        while n <= self.config.max_attempts {
            let slug = candidate(base, n);
            match insert(slug.clone()).await {
                Ok(row) => return Ok(row),
                Err(StoreError::Duplicate(UniqueKey::Slug)) => {
                    log::debug!("Slug {} already claimed, trying next suffix", slug);
                    n += 1;
                }
                Err(e) if e.is_transient() && !retried_transient => {
                    log::debug!("Transient failure claiming slug {}, retrying: {}", slug, e);
                    retried_transient = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(self.exhausted(base))
    }

    fn exhausted(&self, base: &str) -> Error {
        log::error!(
            "Slug allocation for '{}' exhausted {} attempts",
            base,
            self.config.max_attempts
        );
        Error::Conflict(format!("could not allocate a unique slug for '{}'", base))
    }
}
