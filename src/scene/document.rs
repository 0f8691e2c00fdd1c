//! The document root: page list, arrangement modes, units, margins.
//!
//! The document always holds at least one page. The selected-page index
//! stays clamped to the page list through every insert and remove. Page
//! placement is an arrangement algorithm run by the layout pass: modes
//! that show a subset of pages park the rest far offscreen instead of
//! detaching them, so ids, layers and linked-text chains stay stable
//! while the user flips pages.

use std::fmt;
use std::str::FromStr;

use crate::errors::SceneError;
use crate::log::warn;
use crate::scene::kind::NodeKind;
use crate::scene::{Change, NodeId, Prop, PropChange, PropValue, Scene};

/// Far enough that a parked page never intersects a viewport. The exact
/// magnitude is not meaningful.
pub(crate) const OFFSCREEN: f64 = 5000.0;

/// Vertical gap between stacked pages in the continuous modes.
const PAGE_GAP: f64 = 10.0;

/// Breathing room added around the arranged pages in every mode except
/// `Single`.
const ARRANGE_MARGIN: f64 = 10.0;

/// US letter in points.
pub fn page_size_default() -> (f64, f64) {
    (612.0, 792.0)
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for Margins {
    fn default() -> Margins {
        Margins {
            left: 36.0,
            right: 36.0,
            top: 36.0,
            bottom: 36.0,
        }
    }
}

/// How pages are placed relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageLayout {
    /// Only the selected page is visible, at the origin.
    #[default]
    Single,
    /// Pages pair up left/right; the selected pair is visible.
    Double,
    /// Pages group in 2x2 blocks; the selected block is visible.
    Quadruple,
    /// Like `Double`, but page 0 sits alone on the right as a cover.
    Facing,
    /// Every page stacked vertically, all visible.
    Continuous,
    /// Pairs stacked vertically, all visible.
    ContinuousDouble,
}

impl fmt::Display for PageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageLayout::Single => "single",
            PageLayout::Double => "double",
            PageLayout::Quadruple => "quadruple",
            PageLayout::Facing => "facing",
            PageLayout::Continuous => "continuous",
            PageLayout::ContinuousDouble => "continuous-double",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PageLayout {
    type Err = ();

    /// Accepts the canonical names plus the spellings older documents
    /// used.
    fn from_str(s: &str) -> Result<PageLayout, ()> {
        Ok(match s {
            "single" | "one-up" => PageLayout::Single,
            "double" | "two-up" => PageLayout::Double,
            "quadruple" | "four-up" => PageLayout::Quadruple,
            "facing" | "facing-pages" => PageLayout::Facing,
            "continuous" => PageLayout::Continuous,
            "continuous-double" | "continuous-two-up" => PageLayout::ContinuousDouble,
            _ => return Err(()),
        })
    }
}

/// Kind payload for the document root.
#[derive(Debug, Clone, PartialEq)]
pub struct DocData {
    pub(crate) selected_page: usize,
    pub(crate) layout: PageLayout,
    pub(crate) unit: crate::types::Unit,
    pub margins: Margins,
    pub show_margin: bool,
    pub show_grid: bool,
    pub grid_spacing: f64,
}

impl Default for DocData {
    fn default() -> DocData {
        DocData {
            selected_page: 0,
            layout: PageLayout::default(),
            unit: crate::types::Unit::default(),
            margins: Margins::default(),
            show_margin: false,
            show_grid: false,
            grid_spacing: 36.0,
        }
    }
}

impl DocData {
    pub fn selected_page(&self) -> usize {
        self.selected_page
    }

    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    pub fn unit(&self) -> crate::types::Unit {
        self.unit
    }
}

impl Scene {
    fn doc_data(&self, doc: NodeId) -> Result<&DocData, SceneError> {
        match &self[doc].kind {
            NodeKind::Document(data) => Ok(data),
            other => Err(SceneError::WrongKind {
                expected: "document",
                got: other.name(),
            }),
        }
    }

    fn doc_data_mut(&mut self, doc: NodeId) -> Result<&mut DocData, SceneError> {
        match &mut self[doc].kind {
            NodeKind::Document(data) => Ok(data),
            _ => Err(SceneError::WrongKind {
                expected: "document",
                got: "other",
            }),
        }
    }

    /// The document's pages, in order.
    pub fn pages(&self, doc: NodeId) -> &[NodeId] {
        self[doc].children()
    }

    pub fn selected_page(&self, doc: NodeId) -> Result<usize, SceneError> {
        Ok(self.doc_data(doc)?.selected_page)
    }

    pub fn page_layout(&self, doc: NodeId) -> Result<PageLayout, SceneError> {
        Ok(self.doc_data(doc)?.layout)
    }

    pub fn unit(&self, doc: NodeId) -> Result<crate::types::Unit, SceneError> {
        Ok(self.doc_data(doc)?.unit)
    }

    // ------------------------------------------------------------------
    // Page list
    // ------------------------------------------------------------------

    /// Append a page sized like the last existing page (or letter when
    /// there is none) and select it.
    pub fn add_page(&mut self, doc: NodeId) -> Result<NodeId, SceneError> {
        let index = self[doc].children().len();
        self.insert_page(doc, index)
    }

    /// Insert a new page at `index` and select it.
    pub fn insert_page(&mut self, doc: NodeId, index: usize) -> Result<NodeId, SceneError> {
        self.doc_data(doc)?;
        let (w, h) = match self[doc].children().last() {
            Some(&last) => (self[last].width(), self[last].height()),
            None => page_size_default(),
        };
        let page = self.create_page();
        {
            let node = &mut self[page];
            node.width = w;
            node.height = h;
        }
        self.add_child(doc, page, index)?;
        self.select_page(doc, index)?;
        Ok(page)
    }

    /// Remove the page at `index`, releasing its subtree. Refuses to
    /// remove the last remaining page. The selected index stays valid.
    pub fn remove_page(&mut self, doc: NodeId, index: usize) -> Result<(), SceneError> {
        self.doc_data(doc)?;
        let len = self[doc].children().len();
        if index >= len {
            return Err(SceneError::IndexOutOfRange { index, len });
        }
        if len == 1 {
            return Err(SceneError::LastPage);
        }
        let page = self.remove_child(doc, index)?;
        self.release(page);
        let selected = self.doc_data(doc)?.selected_page;
        let clamped = selected.min(self[doc].children().len() - 1);
        let adjusted = if selected > index { selected - 1 } else { clamped };
        self.select_page(doc, adjusted)?;
        // Selection may not have moved, but the arrangement did.
        self.invalidate_layout(doc);
        Ok(())
    }

    /// Select a page by index, clamped into range.
    pub fn select_page(&mut self, doc: NodeId, index: usize) -> Result<(), SceneError> {
        let page_count = self[doc].children().len();
        let data = self.doc_data_mut(doc)?;
        let old = data.selected_page;
        let new = index.min(page_count.saturating_sub(1));
        if old == new {
            return Ok(());
        }
        data.selected_page = new;
        self.push_change(Change::Property(PropChange {
            node: doc,
            prop: Prop::SelectedPage,
            old: PropValue::Num(old as f64),
            new: PropValue::Num(new as f64),
        }));
        self.invalidate_layout(doc);
        Ok(())
    }

    pub fn set_page_layout(&mut self, doc: NodeId, layout: PageLayout) -> Result<(), SceneError> {
        let data = self.doc_data_mut(doc)?;
        let old = data.layout;
        if old == layout {
            return Ok(());
        }
        data.layout = layout;
        self.push_change(Change::Property(PropChange {
            node: doc,
            prop: Prop::PageLayout,
            old: PropValue::Text(old.to_string()),
            new: PropValue::Text(layout.to_string()),
        }));
        self.invalidate_layout(doc);
        Ok(())
    }

    pub fn set_unit(&mut self, doc: NodeId, unit: crate::types::Unit) -> Result<(), SceneError> {
        let data = self.doc_data_mut(doc)?;
        let old = data.unit;
        if old == unit {
            return Ok(());
        }
        data.unit = unit;
        self.push_change(Change::Property(PropChange {
            node: doc,
            prop: Prop::Unit,
            old: PropValue::Text(old.to_string()),
            new: PropValue::Text(unit.to_string()),
        }));
        Ok(())
    }

    /// Parse a page-layout name from an archive, defaulting on legacy
    /// spellings this version no longer knows.
    pub(crate) fn page_layout_from_archive(name: &str) -> PageLayout {
        match name.parse() {
            Ok(layout) => layout,
            Err(()) => {
                warn!("unknown page layout {name:?}, using single");
                PageLayout::default()
            }
        }
    }

    // ------------------------------------------------------------------
    // Arrangement
    // ------------------------------------------------------------------

    /// Position every page for the current mode. Runs inside the layout
    /// pass, so it writes geometry directly and never re-dirties the
    /// tree.
    pub(crate) fn arrange_pages(&mut self, doc: NodeId) {
        let Ok(data) = self.doc_data(doc) else { return };
        let layout = data.layout;
        let selected = data.selected_page;
        let pages: Vec<NodeId> = self[doc].children().to_vec();
        if pages.is_empty() {
            return;
        }

        match layout {
            PageLayout::Single => {
                for (i, &page) in pages.iter().enumerate() {
                    let pos = if i == selected {
                        (0.0, 0.0)
                    } else {
                        (OFFSCREEN, OFFSCREEN)
                    };
                    self.place_page(page, pos);
                }
            }
            PageLayout::Double => self.arrange_pairs(&pages, selected),
            PageLayout::Facing => {
                // Page 0 sits alone, right-aligned, like the cover of an
                // open book.
                if selected == 0 {
                    let w = self[pages[0]].width();
                    self.place_page(pages[0], (w, 0.0));
                    for &page in &pages[1..] {
                        self.place_page(page, (OFFSCREEN, OFFSCREEN));
                    }
                } else {
                    self.place_page(pages[0], (OFFSCREEN, OFFSCREEN));
                    self.arrange_pairs(&pages[1..], selected - 1);
                }
            }
            PageLayout::Quadruple => {
                let block = (selected / 4) * 4;
                for (i, &page) in pages.iter().enumerate() {
                    if i >= block && i < block + 4 {
                        let w = self[page].width();
                        let h = self[page].height();
                        let col = (i - block) % 2;
                        let row = (i - block) / 2;
                        self.place_page(page, (col as f64 * w, row as f64 * h));
                    } else {
                        self.place_page(page, (OFFSCREEN, OFFSCREEN));
                    }
                }
            }
            PageLayout::Continuous => {
                let mut y = 0.0;
                for &page in &pages {
                    self.place_page(page, (0.0, y));
                    y += self[page].height() + PAGE_GAP;
                }
            }
            PageLayout::ContinuousDouble => {
                let mut y = 0.0;
                for row in pages.chunks(2) {
                    let mut row_height: f64 = 0.0;
                    let mut x = 0.0;
                    for &page in row {
                        self.place_page(page, (x, y));
                        x += self[page].width();
                        row_height = row_height.max(self[page].height());
                    }
                    y += row_height + PAGE_GAP;
                }
            }
        }
        self.push_repaint(doc);
    }

    /// Pair `pages` in twos and show the pair containing `selected`.
    fn arrange_pairs(&mut self, pages: &[NodeId], selected: usize) {
        let pair = (selected / 2) * 2;
        for (i, &page) in pages.iter().enumerate() {
            if i == pair {
                self.place_page(page, (0.0, 0.0));
            } else if i == pair + 1 {
                let left_width = self[pages[pair]].width();
                self.place_page(page, (left_width, 0.0));
            } else {
                self.place_page(page, (OFFSCREEN, OFFSCREEN));
            }
        }
    }

    fn place_page(&mut self, page: NodeId, (x, y): (f64, f64)) {
        let node = &mut self[page];
        node.x = x;
        node.y = y;
    }

    /// Size the arranged pages want, mode-dependent. `Single` is exactly
    /// one page; every other mode adds a small margin around the block.
    pub fn preferred_size(&self, doc: NodeId) -> (f64, f64) {
        let Ok(data) = self.doc_data(doc) else {
            return page_size_default();
        };
        let layout = data.layout;
        let pages = self[doc].children();
        let (pw, ph) = match pages.first() {
            Some(&first) => (self[first].width(), self[first].height()),
            None => page_size_default(),
        };
        let (w, h) = match layout {
            PageLayout::Single => return (pw, ph),
            PageLayout::Double | PageLayout::Facing => (pw * 2.0, ph),
            PageLayout::Quadruple => (pw * 2.0, ph * 2.0),
            PageLayout::Continuous => {
                let total: f64 = pages.iter().map(|&p| self[p].height() + PAGE_GAP).sum();
                (pw, total - PAGE_GAP)
            }
            PageLayout::ContinuousDouble => {
                let total: f64 = pages
                    .chunks(2)
                    .map(|row| {
                        row.iter()
                            .map(|&p| self[p].height())
                            .fold(0.0_f64, f64::max)
                            + PAGE_GAP
                    })
                    .sum();
                (pw * 2.0, total - PAGE_GAP)
            }
        };
        (w + 2.0 * ARRANGE_MARGIN, h + 2.0 * ARRANGE_MARGIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_pages(n: usize) -> (Scene, NodeId) {
        let mut scene = Scene::new_letter();
        let doc = scene.document();
        for _ in 1..n {
            scene.add_page(doc).unwrap();
        }
        (scene, doc)
    }

    #[test]
    fn single_parks_unselected_pages_offscreen() {
        let (mut scene, doc) = doc_with_pages(3);
        scene.select_page(doc, 1).unwrap();
        scene.layout_deep(doc);
        let pages = scene.pages(doc).to_vec();
        assert_eq!(scene[pages[1]].x(), 0.0);
        assert_eq!(scene[pages[1]].y(), 0.0);
        assert_eq!(scene[pages[0]].x(), OFFSCREEN);
        assert_eq!(scene[pages[2]].x(), OFFSCREEN);
    }

    #[test]
    fn double_places_the_selected_pair() {
        let (mut scene, doc) = doc_with_pages(4);
        scene.set_page_layout(doc, PageLayout::Double).unwrap();
        scene.select_page(doc, 3).unwrap();
        scene.layout_deep(doc);
        let pages = scene.pages(doc).to_vec();
        assert_eq!(scene[pages[2]].x(), 0.0);
        assert_eq!(scene[pages[3]].x(), scene[pages[2]].width());
        assert_eq!(scene[pages[0]].x(), OFFSCREEN);
        assert_eq!(scene[pages[1]].x(), OFFSCREEN);
    }

    #[test]
    fn facing_right_aligns_the_cover() {
        let (mut scene, doc) = doc_with_pages(3);
        scene.set_page_layout(doc, PageLayout::Facing).unwrap();
        // add_page selects each new page, so bring the cover back first.
        scene.select_page(doc, 0).unwrap();
        scene.layout_deep(doc);
        let pages = scene.pages(doc).to_vec();
        assert_eq!(scene[pages[0]].x(), scene[pages[0]].width());
        assert_eq!(scene[pages[1]].x(), OFFSCREEN);

        // Pages 1 and 2 pair up once either is selected.
        scene.select_page(doc, 1).unwrap();
        scene.layout_deep(doc);
        assert_eq!(scene[pages[0]].x(), OFFSCREEN);
        assert_eq!(scene[pages[1]].x(), 0.0);
        assert_eq!(scene[pages[2]].x(), scene[pages[1]].width());
    }

    #[test]
    fn continuous_stacks_every_page() {
        let (mut scene, doc) = doc_with_pages(3);
        scene.set_page_layout(doc, PageLayout::Continuous).unwrap();
        scene.layout_deep(doc);
        let pages = scene.pages(doc).to_vec();
        let h = scene[pages[0]].height();
        assert_eq!(scene[pages[0]].y(), 0.0);
        assert_eq!(scene[pages[1]].y(), h + PAGE_GAP);
        assert_eq!(scene[pages[2]].y(), 2.0 * (h + PAGE_GAP));
    }

    #[test]
    fn remove_page_keeps_selection_valid_and_refuses_last() {
        let (mut scene, doc) = doc_with_pages(3);
        scene.select_page(doc, 2).unwrap();
        scene.remove_page(doc, 2).unwrap();
        assert_eq!(scene.selected_page(doc).unwrap(), 1);
        scene.remove_page(doc, 0).unwrap();
        assert_eq!(scene.selected_page(doc).unwrap(), 0);
        assert!(matches!(
            scene.remove_page(doc, 0),
            Err(SceneError::LastPage)
        ));
        assert_eq!(scene.pages(doc).len(), 1);
    }

    #[test]
    fn preferred_size_follows_the_mode() {
        let (mut scene, doc) = doc_with_pages(2);
        let (pw, ph) = page_size_default();
        assert_eq!(scene.preferred_size(doc), (pw, ph));

        scene.set_page_layout(doc, PageLayout::Double).unwrap();
        let (w, h) = scene.preferred_size(doc);
        assert!(w > pw * 2.0 && h > ph);

        scene.set_page_layout(doc, PageLayout::Continuous).unwrap();
        let (w, h) = scene.preferred_size(doc);
        assert_eq!(w, pw + 2.0 * ARRANGE_MARGIN);
        assert!(h > 2.0 * ph);
    }

    #[test]
    fn legacy_layout_names_parse() {
        assert_eq!("two-up".parse(), Ok(PageLayout::Double));
        assert_eq!(
            Scene::page_layout_from_archive("mystery-mode"),
            PageLayout::Single
        );
    }
}
