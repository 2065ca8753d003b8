use crate::error::FilterError;
use crate::filter::{FilterContext, MatchResult};
use core::ops::BitOr;
use std::path::{Path, PathBuf};

/// Object kinds as the host object store reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Commit,
    Tree,
    Blob,
    Tag,
}

/// Where in the enumeration the host is calling from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSituation {
    Commit,
    Tag,
    BeginTree,
    EndTree,
    Blob,
}

/// Flags handed back to the host for each object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterFlags(u32);

impl FilterFlags {
    pub const ZERO: FilterFlags = FilterFlags(0);
    pub const MARK_SEEN: FilterFlags = FilterFlags(1 << 0);
    pub const SHOW: FilterFlags = FilterFlags(1 << 1);

    pub fn contains(self, other: FilterFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FilterFlags {
    type Output = FilterFlags;

    fn bitor(self, rhs: FilterFlags) -> FilterFlags {
        FilterFlags(self.0 | rhs.0)
    }
}

/// The host repository as the filter sees it: where its gitdir lives and
/// how wide its object hashes are.
#[derive(Debug, Clone)]
pub struct Repository {
    gitdir: PathBuf,
    hash_size: usize,
}

impl Repository {
    pub fn new(gitdir: impl Into<PathBuf>, hash_size: usize) -> Self {
        Self {
            gitdir: gitdir.into(),
            hash_size,
        }
    }

    pub fn gitdir(&self) -> &Path {
        &self.gitdir
    }

    pub fn hash_size(&self) -> usize {
        self.hash_size
    }
}

/// One enumerated object: its kind and the raw bytes of its id.
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'a> {
    pub kind: ObjectType,
    pub oid: &'a [u8],
}

/// The extension descriptor the host resolves by name: three entry
/// points covering context setup, one call per enumerated object, and
/// teardown.
pub struct FilterExtension {
    pub name: &'static str,
    pub init: fn(&Repository, &str) -> Result<FilterContext, FilterError>,
    pub filter_object:
        fn(&Repository, FilterSituation, &ObjectRef, &str, &str, &mut bool, &mut FilterContext)
            -> FilterFlags,
    pub free: fn(&Repository, FilterContext),
}

pub static FILTER_EXTENSION_SPATIAL: FilterExtension = FilterExtension {
    name: "spatial",
    init: spatial_filter_init,
    filter_object: spatial_filter_object,
    free: spatial_filter_free,
};

fn spatial_filter_init(repo: &Repository, filter_arg: &str) -> Result<FilterContext, FilterError> {
    FilterContext::init(repo, filter_arg)
}

fn spatial_filter_object(
    repo: &Repository,
    situation: FilterSituation,
    object: &ObjectRef,
    pathname: &str,
    _filename: &str,
    omit: &mut bool,
    ctx: &mut FilterContext,
) -> FilterFlags {
    const MARK_SEEN_AND_SHOW: FilterFlags = FilterFlags(1 | 2);

    ctx.record_call();

    match situation {
        FilterSituation::Commit => {
            assert_eq!(object.kind, ObjectType::Commit);
            MARK_SEEN_AND_SHOW
        }
        FilterSituation::Tag => {
            assert_eq!(object.kind, ObjectType::Tag);
            MARK_SEEN_AND_SHOW
        }
        FilterSituation::BeginTree => {
            assert_eq!(object.kind, ObjectType::Tree);
            // Always include all tree objects
            MARK_SEEN_AND_SHOW
        }
        FilterSituation::EndTree => {
            assert_eq!(object.kind, ObjectType::Tree);
            FilterFlags::ZERO
        }
        FilterSituation::Blob => {
            assert_eq!(object.kind, ObjectType::Blob);
            debug_assert_eq!(object.oid.len(), repo.hash_size());

            if !ctx.has_index() {
                // No valid spatial index for this repository; omit nothing
                return MARK_SEEN_AND_SHOW;
            }

            match ctx.classify(object.oid, pathname) {
                Ok(MatchResult::Match) => {
                    ctx.record_match();
                    MARK_SEEN_AND_SHOW
                }
                Ok(MatchResult::NotMatched) => {
                    *omit = true;
                    FilterFlags::MARK_SEEN
                }
                Err(err) => {
                    // Omitting silently could corrupt downstream state and
                    // matching silently would defeat the filter, so fail loud
                    eprintln!("\nspatial-filter: Error: {}", err);
                    std::process::abort();
                }
            }
        }
    }
}

fn spatial_filter_free(_repo: &Repository, ctx: FilterContext) {
    ctx.free();
}
