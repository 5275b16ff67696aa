//! Offline consistency audit of a set of pages.
//!
//! Used by `quire check` on a snapshot. The audit reads pages only and never
//! repairs anything.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use quire_store::{LinkTarget, Page, PageType};

/// Broken tree invariant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// Several siblings share an order.
    DuplicateOrder {
        scope: String,
        order: u32,
        page_ids: Vec<String>,
    },
    /// Sibling orders are not `1..=n`.
    OrderGap { scope: String, orders: Vec<u32> },
    /// Parent id points to no page.
    MissingParent { page_id: String, parent_id: String },
    /// Parent lives in another reference scope.
    ForeignParent { page_id: String, parent_id: String },
    /// Translation without a usable parent.
    OrphanTranslation { page_id: String },
    /// Translation without a `lang`.
    TranslationWithoutLang { page_id: String },
    /// Two translations of a page share a language.
    DuplicateTranslation { parent_id: String, lang: String },
    /// LINK targeting a page that does not exist.
    DanglingLink { page_id: String, target_id: String },
    /// LINK publication differs from its target's.
    LinkPublication { page_id: String, target_id: String },
    /// Folder carrying content.
    FolderWithContent { page_id: String },
    /// More than one homepage in a reference scope.
    MultipleHomepages { scope: String, page_ids: Vec<String> },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateOrder {
                scope,
                order,
                page_ids,
            } => write!(f, "{scope}: order {order} is shared by [{}]", page_ids.join(", ")),
            Self::OrderGap { scope, orders } => {
                let orders: Vec<String> = orders.iter().map(u32::to_string).collect();
                write!(f, "{scope}: orders [{}] are not contiguous", orders.join(", "))
            }
            Self::MissingParent { page_id, parent_id } => {
                write!(f, "page [{page_id}] has unknown parent [{parent_id}]")
            }
            Self::ForeignParent { page_id, parent_id } => {
                write!(f, "page [{page_id}] has parent [{parent_id}] in another reference")
            }
            Self::OrphanTranslation { page_id } => {
                write!(f, "translation [{page_id}] has no translatable parent")
            }
            Self::TranslationWithoutLang { page_id } => {
                write!(f, "translation [{page_id}] has no lang")
            }
            Self::DuplicateTranslation { parent_id, lang } => {
                write!(f, "page [{parent_id}] has several [{lang}] translations")
            }
            Self::DanglingLink { page_id, target_id } => {
                write!(f, "link [{page_id}] targets unknown page [{target_id}]")
            }
            Self::LinkPublication { page_id, target_id } => {
                write!(f, "link [{page_id}] publication differs from target [{target_id}]")
            }
            Self::FolderWithContent { page_id } => write!(f, "folder [{page_id}] has a content"),
            Self::MultipleHomepages { scope, page_ids } => {
                write!(f, "{scope}: several homepages [{}]", page_ids.join(", "))
            }
        }
    }
}

/// Check `pages` against the tree invariants.
///
/// Violations are reported in a stable order: sibling groups first (sorted
/// by scope), then per-page findings in input order, then homepages.
#[must_use]
pub fn check(pages: &[Page]) -> Vec<Violation> {
    let by_id: HashMap<&str, &Page> = pages.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut violations = Vec::new();

    let mut groups: BTreeMap<String, Vec<&Page>> = BTreeMap::new();
    for page in pages.iter().filter(|p| p.page_type.shifts_siblings()) {
        let scope = format!(
            "{}/{}",
            page.reference,
            page.parent_id.as_deref().unwrap_or("-")
        );
        groups.entry(scope).or_default().push(page);
    }
    for (scope, siblings) in groups {
        check_orders(&scope, &siblings, &mut violations);
    }

    let mut langs: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for page in pages {
        let parent = page.parent_id.as_deref().map(|id| (id, by_id.get(id).copied()));
        match parent {
            Some((parent_id, None)) => violations.push(Violation::MissingParent {
                page_id: page.id.clone(),
                parent_id: parent_id.to_owned(),
            }),
            Some((parent_id, Some(parent))) if parent.reference != page.reference => {
                violations.push(Violation::ForeignParent {
                    page_id: page.id.clone(),
                    parent_id: parent_id.to_owned(),
                });
            }
            _ => {}
        }

        match page.page_type {
            PageType::Translation => {
                let parent = parent.and_then(|(_, p)| p);
                if !parent.is_some_and(|p| translatable(p.page_type)) {
                    violations.push(Violation::OrphanTranslation {
                        page_id: page.id.clone(),
                    });
                }
                match (page.parent_id.as_deref(), page.lang()) {
                    (_, None) => violations.push(Violation::TranslationWithoutLang {
                        page_id: page.id.clone(),
                    }),
                    (Some(parent_id), Some(lang)) => {
                        *langs.entry((parent_id, lang)).or_default() += 1;
                    }
                    (None, Some(_)) => {}
                }
            }
            PageType::Link => {
                if let Some(LinkTarget::Page(target_id)) = page.link_target() {
                    match by_id.get(target_id) {
                        None => violations.push(Violation::DanglingLink {
                            page_id: page.id.clone(),
                            target_id: target_id.to_owned(),
                        }),
                        Some(target) if target.published != page.published => {
                            violations.push(Violation::LinkPublication {
                                page_id: page.id.clone(),
                                target_id: target_id.to_owned(),
                            });
                        }
                        Some(_) => {}
                    }
                }
            }
            PageType::Folder | PageType::SystemFolder => {
                if page.content.as_deref().is_some_and(|c| !c.is_empty()) {
                    violations.push(Violation::FolderWithContent {
                        page_id: page.id.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    for ((parent_id, lang), count) in langs {
        if count > 1 {
            violations.push(Violation::DuplicateTranslation {
                parent_id: parent_id.to_owned(),
                lang: lang.to_owned(),
            });
        }
    }

    let mut homepages: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for page in pages.iter().filter(|p| p.homepage) {
        homepages
            .entry(page.reference.to_string())
            .or_default()
            .push(page.id.clone());
    }
    for (scope, page_ids) in homepages {
        if page_ids.len() > 1 {
            violations.push(Violation::MultipleHomepages { scope, page_ids });
        }
    }

    violations
}

fn check_orders(scope: &str, siblings: &[&Page], violations: &mut Vec<Violation>) {
    let mut by_order: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for page in siblings {
        by_order.entry(page.order).or_default().push(page.id.clone());
    }

    let mut duplicated = false;
    for (order, page_ids) in &by_order {
        if page_ids.len() > 1 {
            duplicated = true;
            violations.push(Violation::DuplicateOrder {
                scope: scope.to_owned(),
                order: *order,
                page_ids: page_ids.clone(),
            });
        }
    }
    if duplicated {
        return;
    }

    let orders: Vec<u32> = by_order.into_keys().collect();
    let contiguous = orders.iter().zip(1..).all(|(order, expected)| *order == expected);
    if !contiguous {
        violations.push(Violation::OrderGap {
            scope: scope.to_owned(),
            orders,
        });
    }
}

fn translatable(parent_type: PageType) -> bool {
    !matches!(
        parent_type,
        PageType::Root | PageType::SystemFolder | PageType::Translation
    )
}
