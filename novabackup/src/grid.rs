//! Grid placement
//!
//! Turns a set of favorites into the row-major cell list a renderer lays out.
//! Collisions keep the first occupant; cells outside the grid are dropped.
//! Both are reported, never raised. Coordinates come straight from the
//! database, so all arithmetic on them saturates.

use std::collections::HashSet;
use std::ops::Range;

use serde::Serialize;

use crate::interface::Diagnostic;
use crate::models::{Favorite, ItemType};
use crate::preferences::MAX_GRID_DIMENSION;
use crate::resolver::LauncherLayout;

/// Largest grid `place` lays out
pub const MAX_GRID_CELLS: usize = MAX_GRID_DIMENSION * MAX_GRID_DIMENSION;
/// Out-of-bounds cells reported per item; the rest only show up in the log
const MAX_REPORTED_OUT_OF_BOUNDS: usize = 16;

/// A placed item ready to draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub id: i64,
    pub title: Option<String>,
    /// Never set for folders; their preview is the contents
    pub icon_url: Option<String>,
    pub item_type: ItemType,
    pub span_x: i64,
    pub span_y: i64,
    /// Folder contents in folder-grid order
    pub folder: Vec<ItemView>,
}

/// One slot of the render list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum GridUnit {
    Empty,
    Item(ItemView),
}

impl GridUnit {
    pub fn item(&self) -> Option<&ItemView> {
        match self {
            GridUnit::Item(view) => Some(view),
            GridUnit::Empty => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPlacement {
    pub rows: usize,
    pub cols: usize,
    pub units: Vec<GridUnit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GridPlacement {
    pub fn items(&self) -> impl Iterator<Item = &ItemView> {
        self.units.iter().filter_map(GridUnit::item)
    }
}

/// Desktop and dock grids for one screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenRender {
    pub screen_id: i64,
    pub desktop: GridPlacement,
    pub hotseat: GridPlacement,
}

/// Place `items` on a `rows` × `cols` grid.
pub fn place(layout: &LauncherLayout, items: &[&Favorite], rows: usize, cols: usize) -> GridPlacement {
    let mut diagnostics = Vec::new();
    let Some(cell_count) = rows.checked_mul(cols).filter(|&n| n <= MAX_GRID_CELLS) else {
        tracing::error!(rows, cols, "grid too large to place");
        diagnostics.push(Diagnostic::GridTooLarge { rows, cols });
        return GridPlacement { rows, cols, units: Vec::new(), diagnostics };
    };
    let mut cells: Vec<Option<usize>> = vec![None; cell_count];

    for (index, item) in items.iter().enumerate() {
        let xs = item.cell_x..item.cell_x.saturating_add(item.span_x);
        let ys = item.cell_y..item.cell_y.saturating_add(item.span_y);

        for x in clip(&xs, cols) {
            for y in clip(&ys, rows) {
                let cell = y * cols + x;
                let (x, y) = (x as i64, y as i64);
                match cells[cell] {
                    Some(occupant) => {
                        let current = items[occupant];
                        tracing::warn!(
                            x,
                            y,
                            occupant = ?current.title,
                            intruder = ?item.title,
                            "collision in grid"
                        );
                        diagnostics.push(Diagnostic::GridCollision {
                            x,
                            y,
                            occupant: current.id,
                            intruder: item.id,
                        });
                    }
                    None => cells[cell] = Some(index),
                }
            }
        }

        let mut outside = out_of_bounds_cells(xs, ys, rows, cols);
        for (x, y) in outside.by_ref().take(MAX_REPORTED_OUT_OF_BOUNDS) {
            tracing::error!(x, y, item = item.id, title = ?item.title, "out of bounds");
            diagnostics.push(Diagnostic::GridOutOfBounds { item: item.id, x, y });
        }
        if outside.next().is_some() {
            tracing::error!(
                item = item.id,
                reported = MAX_REPORTED_OUT_OF_BOUNDS,
                "further out-of-bounds cells not reported"
            );
        }
    }

    let mut units = Vec::with_capacity(cells.len());
    for y in 0..rows {
        for x in 0..cols {
            match cells[y * cols + x] {
                None => units.push(GridUnit::Empty),
                Some(index) => {
                    let item = items[index];
                    // Remaining cells of a multi-cell item belong to its anchor
                    if item.cell_x == x as i64 && item.cell_y == y as i64 {
                        units.push(GridUnit::Item(item_view(layout, item, &mut HashSet::new())));
                    }
                }
            }
        }
    }

    GridPlacement { rows, cols, units, diagnostics }
}

/// Render the desktop grid of `screen_id` and the dock.
pub fn render_screen(layout: &LauncherLayout, screen_id: i64) -> Option<ScreenRender> {
    let screen = layout.screen(screen_id)?;
    let desktop_items: Vec<&Favorite> = screen
        .favorites
        .iter()
        .filter_map(|&id| layout.favorite(id))
        .filter(|fav| fav.on_desktop())
        .collect();
    let settings = layout.settings;

    Some(ScreenRender {
        screen_id,
        desktop: place(layout, &desktop_items, settings.rows, settings.cols),
        hotseat: place(layout, &layout.hotseat(), 1, settings.dock_cols),
    })
}

/// The part of `range` inside `0..extent`
fn clip(range: &Range<i64>, extent: usize) -> Range<usize> {
    let extent = i64::try_from(extent).unwrap_or(i64::MAX);
    let start = range.start.clamp(0, extent);
    let end = range.end.clamp(start, extent);
    start as usize..end as usize
}

/// Cells of the `xs` × `ys` rectangle outside the grid, column by column.
/// Lazy: columns inside the grid only yield their rows above or below it.
fn out_of_bounds_cells(
    xs: Range<i64>,
    ys: Range<i64>,
    rows: usize,
    cols: usize,
) -> impl Iterator<Item = (i64, i64)> {
    let inside_x = clip(&xs, cols);
    let inside_y = clip(&ys, rows);
    let (top, bottom) = (inside_y.start as i64, inside_y.end as i64);
    xs.flat_map(move |x| {
        let column_inside = usize::try_from(x).is_ok_and(|x| inside_x.contains(&x));
        let (before, after) = if column_inside {
            (ys.start..ys.end.min(top), ys.start.max(bottom)..ys.end)
        } else {
            (ys.clone(), 0..0)
        };
        before.chain(after).map(move |y| (x, y))
    })
}

fn item_view(layout: &LauncherLayout, item: &Favorite, visiting: &mut HashSet<i64>) -> ItemView {
    let folder = if item.is_folder() && visiting.insert(item.id) {
        let views: Vec<ItemView> = folder_order(layout.folder_contents(item))
            .into_iter()
            .map(|child| item_view(layout, child, visiting))
            .collect();
        visiting.remove(&item.id);
        views
    } else {
        Vec::new()
    };

    ItemView {
        id: item.id,
        title: item.display_title().map(str::to_string),
        icon_url: if item.is_folder() { None } else { item.icon_url.clone() },
        item_type: item.item_type,
        span_x: item.span_x,
        span_y: item.span_y,
        folder,
    }
}

/// Folder contents sorted by `cell_y * width + cell_x`, where `width` is the
/// largest `cell_x` inside the folder rather than the desktop column count.
pub fn folder_order(mut contents: Vec<&Favorite>) -> Vec<&Favorite> {
    let width = contents.iter().map(|fav| fav.cell_x).max().unwrap_or(0).max(0);
    contents.sort_by_key(|fav| fav.cell_y.saturating_mul(width).saturating_add(fav.cell_x));
    contents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::LayoutSettings;
    use crate::models::{CONTAINER_HOTSEAT, CONTAINER_NONE};
    use crate::resolver::resolve;
    use std::collections::HashMap;

    fn item(id: i64, x: i64, y: i64, span_x: i64, span_y: i64) -> Favorite {
        Favorite {
            id,
            title: Some(format!("App {}", id)),
            screen: 1,
            screen_rank: 0,
            cell_x: x,
            cell_y: y,
            span_x,
            span_y,
            ..Favorite::default()
        }
    }

    fn layout_of(favorites: Vec<Favorite>) -> LauncherLayout {
        let settings = LayoutSettings { rows: 4, cols: 4, dock_cols: 5, default_screen: None };
        resolve(HashMap::new(), favorites, settings).0
    }

    fn place_all(layout: &LauncherLayout, rows: usize, cols: usize) -> GridPlacement {
        let items: Vec<&Favorite> = layout.favorites().iter().collect();
        place(layout, &items, rows, cols)
    }

    #[test]
    fn test_empty_grid_is_all_placeholders() {
        let layout = layout_of(vec![]);
        let placement = place_all(&layout, 2, 3);
        assert_eq!(placement.units, vec![GridUnit::Empty; 6]);
        assert!(placement.diagnostics.is_empty());
    }

    #[test]
    fn test_collision_keeps_first_occupant() {
        let layout = layout_of(vec![item(1, 0, 0, 1, 1), item(2, 0, 0, 1, 1)]);
        let placement = place_all(&layout, 4, 4);
        assert_eq!(
            placement.diagnostics,
            vec![Diagnostic::GridCollision { x: 0, y: 0, occupant: 1, intruder: 2 }]
        );
        assert_eq!(placement.items().map(|v| v.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(placement.units.len(), 16);
    }

    #[test]
    fn test_out_of_bounds_cells_are_dropped() {
        let layout = layout_of(vec![item(1, 3, 3, 2, 2)]);
        let placement = place_all(&layout, 4, 4);
        assert_eq!(
            placement.diagnostics,
            vec![
                Diagnostic::GridOutOfBounds { item: 1, x: 3, y: 4 },
                Diagnostic::GridOutOfBounds { item: 1, x: 4, y: 3 },
                Diagnostic::GridOutOfBounds { item: 1, x: 4, y: 4 },
            ]
        );
        // (3,3) is the anchor and still placed
        assert_eq!(placement.units.len(), 16);
        assert_eq!(placement.units[15].item().map(|v| v.id), Some(1));
    }

    #[test]
    fn test_negative_cells_are_out_of_bounds() {
        let layout = layout_of(vec![item(1, -1, 0, 1, 1)]);
        let placement = place_all(&layout, 1, 1);
        assert_eq!(placement.diagnostics, vec![Diagnostic::GridOutOfBounds { item: 1, x: -1, y: 0 }]);
        assert_eq!(placement.units, vec![GridUnit::Empty]);
    }

    #[test]
    fn test_multi_cell_item_emits_one_unit_at_anchor() {
        let layout = layout_of(vec![item(1, 1, 0, 2, 2), item(2, 0, 1, 1, 1)]);
        let placement = place_all(&layout, 2, 3);
        // row 0: empty, item 1 (covers (1,0),(2,0)); row 1: item 2, rest consumed by item 1
        assert_eq!(placement.units.len(), 3);
        assert_eq!(placement.units[0], GridUnit::Empty);
        let wide = placement.units[1].item().unwrap();
        assert_eq!((wide.id, wide.span_x, wide.span_y), (1, 2, 2));
        assert_eq!(placement.units[2].item().map(|v| v.id), Some(2));
    }

    #[test]
    fn test_item_losing_anchor_to_collision_is_not_emitted() {
        let layout = layout_of(vec![item(1, 0, 0, 1, 1), item(2, 0, 0, 2, 1)]);
        let placement = place_all(&layout, 1, 2);
        assert_eq!(placement.units.len(), 1);
        assert_eq!(placement.units[0].item().map(|v| v.id), Some(1));
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let far = item(1, i64::MAX - 1, i64::MAX - 1, 2, 2);
        let huge = item(2, 0, 0, i64::MAX, i64::MAX);
        let layout = layout_of(vec![far, huge]);
        let placement = place_all(&layout, 2, 2);

        // Item 2 fills the grid; only the first reports of each item are kept
        assert_eq!(placement.items().map(|v| v.id).collect::<Vec<_>>(), vec![2]);
        let reported = |id| {
            placement
                .diagnostics
                .iter()
                .filter(|d| matches!(d, Diagnostic::GridOutOfBounds { item, .. } if *item == id))
                .count()
        };
        assert_eq!(reported(1), 1);
        assert_eq!(reported(2), MAX_REPORTED_OUT_OF_BOUNDS);
        assert_eq!(placement.diagnostics[0], Diagnostic::GridOutOfBounds { item: 1, x: i64::MAX - 1, y: i64::MAX - 1 });
        assert_eq!(placement.diagnostics[1], Diagnostic::GridOutOfBounds { item: 2, x: 0, y: 2 });
    }

    #[test]
    fn test_oversized_grid_is_refused() {
        let layout = layout_of(vec![item(1, 0, 0, 1, 1)]);
        let placement = place_all(&layout, usize::MAX, 2);
        assert!(placement.units.is_empty());
        assert_eq!(placement.diagnostics, vec![Diagnostic::GridTooLarge { rows: usize::MAX, cols: 2 }]);
        assert!(placement.diagnostics[0].is_grid_anomaly());

        let placement = place_all(&layout, MAX_GRID_DIMENSION + 1, MAX_GRID_DIMENSION);
        assert!(placement.units.is_empty());
    }

    #[test]
    fn test_folder_order_saturates() {
        let a = Favorite { id: 1, cell_x: i64::MAX, cell_y: i64::MAX, ..Favorite::default() };
        let b = Favorite { id: 2, cell_x: 0, cell_y: 0, ..Favorite::default() };
        let sorted: Vec<i64> = folder_order(vec![&a, &b]).iter().map(|f| f.id).collect();
        assert_eq!(sorted, vec![2, 1]);
    }

    #[test]
    fn test_folder_order_uses_folder_width() {
        let a = Favorite { id: 1, cell_x: 2, cell_y: 0, ..Favorite::default() };
        let b = Favorite { id: 2, cell_x: 0, cell_y: 1, ..Favorite::default() };
        let c = Favorite { id: 3, cell_x: 1, cell_y: 0, ..Favorite::default() };
        // width = 2: a=2, b=2, c=1; ties keep input order
        let sorted: Vec<i64> = folder_order(vec![&a, &b, &c]).iter().map(|f| f.id).collect();
        assert_eq!(sorted, vec![3, 1, 2]);
    }

    #[test]
    fn test_folder_view_flattens_contents_without_icon() {
        let folder = Favorite {
            item_type: ItemType::Folder,
            icon_url: None,
            icon: Some(vec![1]),
            ..item(10, 0, 0, 1, 1)
        };
        let first = Favorite { id: 11, container: 10, screen: 0, cell_x: 1, cell_y: 0, ..Favorite::default() };
        let second = Favorite { id: 12, container: 10, screen: 0, cell_x: 0, cell_y: 0, ..Favorite::default() };
        let layout = layout_of(vec![folder, first, second]);
        let items: Vec<&Favorite> = layout.screen_favorites(1);
        let placement = place(&layout, &items, 1, 1);
        let view = placement.units[0].item().unwrap();
        assert_eq!(view.icon_url, None);
        assert_eq!(view.folder.iter().map(|v| v.id).collect::<Vec<_>>(), vec![12, 11]);
    }

    #[test]
    fn test_self_containing_folder_terminates() {
        let folder = Favorite { item_type: ItemType::Folder, container: 10, ..item(10, 0, 0, 1, 1) };
        let layout = layout_of(vec![folder]);
        let placement = place_all(&layout, 1, 1);
        let view = placement.units[0].item().unwrap();
        assert_eq!(view.folder.len(), 1);
        assert!(view.folder[0].folder.is_empty());
    }

    #[test]
    fn test_widget_title_fallback() {
        let widget = Favorite {
            item_type: ItemType::Widget,
            package_name: "com.weather".into(),
            title: Some("ignored".into()),
            ..item(1, 0, 0, 1, 1)
        };
        let layout = layout_of(vec![widget]);
        let placement = place_all(&layout, 1, 1);
        assert_eq!(placement.units[0].item().unwrap().title.as_deref(), Some("com.weather"));
    }

    #[test]
    fn test_render_screen_splits_desktop_and_dock() {
        let desk = Favorite { container: CONTAINER_NONE, ..item(1, 0, 0, 1, 1) };
        let dock = Favorite { container: CONTAINER_HOTSEAT, screen: 0, ..item(2, 2, 0, 1, 1) };
        let in_folder = Favorite { container: 1, ..item(3, 0, 0, 1, 1) };
        let layout = layout_of(vec![desk, dock, in_folder]);

        let render = render_screen(&layout, 1).unwrap();
        assert_eq!(render.desktop.units.len(), 16);
        assert!(render.desktop.diagnostics.is_empty(), "folder child must not collide");
        assert_eq!(render.hotseat.units.len(), 5);
        assert_eq!(render.hotseat.units[2].item().map(|v| v.id), Some(2));
        assert!(render_screen(&layout, 42).is_none());
    }
}
