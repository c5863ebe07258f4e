use std::fmt;

/// Page kinds spanning both storage-file implementations. The heap file
/// uses only `Heap`; the B+ tree file uses the remaining four. Folding both
/// into one tagged type is what lets `DbFile` expose a single `PageId` type
/// across both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageCategory {
    Heap,
    RootPointer,
    Internal,
    Leaf,
    Header,
}

impl fmt::Display for PageCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            PageCategory::Heap => "Heap",
            PageCategory::RootPointer => "RootPointer",
            PageCategory::Internal => "Internal",
            PageCategory::Leaf => "Leaf",
            PageCategory::Header => "Header",
        };
        write!(f, "{}", s)
    }
}

/// Sentinel used for "no such page" sibling/parent/header links: page
/// index 0 is always the root-pointer page, which can never be a sibling
/// or a header-list entry, so the sentinel never collides with a real
/// page.
pub const EMPTY_PAGE_ID: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub table_id: i32,
    pub page_index: u32,
    pub category: PageCategory,
}

impl PageId {
    pub fn new(table_id: i32, page_index: u32, category: PageCategory) -> Self {
        Self {
            table_id,
            page_index,
            category,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}_{}", self.table_id, self.category, self.page_index)
    }
}

/// Derives a stable table id by hashing a file's absolute path.
pub fn table_id_from_path(path: &std::path::Path) -> i32 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    (hasher.finish() & 0x7fff_ffff) as i32
}
