//! Index spatial des points de bord en attente de fusion

use std::collections::HashMap;

use crate::feature::FeatureId;
use crate::point::Point;

type CellKey = (i64, i64);

#[derive(Debug, Clone)]
struct Entry {
    id: u64,
    point: Point,
    feature: FeatureId,
}

/// Correspondance trouvée dans l'index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMatch {
    entry: u64,
    cell: CellKey,
    /// Feature propriétaire du point indexé
    pub feature: FeatureId,
}

/// Grille de points de bord, valeurs = identifiants de features
///
/// La taille de cellule vaut la tolérance: un point proche se trouve
/// forcément dans l'une des 9 cellules voisines.
#[derive(Debug, Clone)]
pub struct BorderPointIndex {
    tolerance: f64,
    cell_size: f64,
    cells: HashMap<CellKey, Vec<Entry>>,
    /// Cellules occupées par chaque feature (une occurrence par entrée)
    owners: HashMap<FeatureId, Vec<CellKey>>,
    next_entry: u64,
    len: usize,
}

impl BorderPointIndex {
    pub fn new(tolerance: f64) -> Self {
        let cell_size = if tolerance > 0.0 && tolerance.is_finite() {
            tolerance
        } else {
            1.0
        };
        Self {
            tolerance,
            cell_size,
            cells: HashMap::new(),
            owners: HashMap::new(),
            next_entry: 0,
            len: 0,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn cell_of(&self, point: &Point) -> CellKey {
        (
            (point.x() / self.cell_size).floor() as i64,
            (point.y() / self.cell_size).floor() as i64,
        )
    }

    /// Enregistre un point de bord en attente
    pub fn insert(&mut self, point: &Point, feature: FeatureId) {
        let cell = self.cell_of(point);
        let id = self.next_entry;
        self.next_entry += 1;

        self.cells.entry(cell).or_default().push(Entry {
            id,
            point: point.clone(),
            feature,
        });
        self.owners.entry(feature).or_default().push(cell);
        self.len += 1;
    }

    /// Points indexés égaux ou proches de `point`
    pub fn find(&self, point: &Point) -> Vec<IndexMatch> {
        let (cx, cy) = self.cell_of(point);
        let mut matches = Vec::new();

        for dx in -1..=1 {
            for dy in -1..=1 {
                let cell = (cx + dx, cy + dy);
                let Some(entries) = self.cells.get(&cell) else {
                    continue;
                };
                matches.extend(
                    entries
                        .iter()
                        .filter(|e| e.point == *point || e.point.near(point, self.tolerance))
                        .map(|e| IndexMatch {
                            entry: e.id,
                            cell,
                            feature: e.feature,
                        }),
                );
            }
        }

        matches.sort_by_key(|m| m.entry);
        matches
    }

    /// Retire une entrée trouvée par `find` (sans effet si déjà retirée)
    pub fn remove(&mut self, found: &IndexMatch) -> bool {
        let Some(entries) = self.cells.get_mut(&found.cell) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|e| e.id == found.entry) else {
            return false;
        };

        let entry = entries.swap_remove(pos);
        if entries.is_empty() {
            self.cells.remove(&found.cell);
        }
        self.forget_owner(entry.feature, found.cell);
        self.len -= 1;
        true
    }

    fn forget_owner(&mut self, feature: FeatureId, cell: CellKey) {
        if let Some(cells) = self.owners.get_mut(&feature) {
            if let Some(pos) = cells.iter().position(|c| *c == cell) {
                cells.swap_remove(pos);
            }
            if cells.is_empty() {
                self.owners.remove(&feature);
            }
        }
    }

    /// La feature a encore au moins un point en attente
    pub fn contains_feature(&self, feature: FeatureId) -> bool {
        self.owners.contains_key(&feature)
    }

    /// Nombre de points en attente pour une feature
    pub fn pending_points(&self, feature: FeatureId) -> usize {
        self.owners.get(&feature).map_or(0, Vec::len)
    }

    /// Nombre de features distinctes en attente
    pub fn pending_features(&self) -> usize {
        self.owners.len()
    }

    /// Transfère les entrées de `from` vers `to` (après fusion de `from` dans `to`)
    pub fn reassign(&mut self, from: FeatureId, to: FeatureId) -> usize {
        if from == to {
            return 0;
        }
        let Some(cells) = self.owners.remove(&from) else {
            return 0;
        };

        let mut moved = 0;
        let mut visited: Vec<CellKey> = Vec::with_capacity(cells.len());
        for cell in &cells {
            if visited.contains(cell) {
                continue;
            }
            visited.push(*cell);
            if let Some(entries) = self.cells.get_mut(cell) {
                for entry in entries.iter_mut().filter(|e| e.feature == from) {
                    entry.feature = to;
                    moved += 1;
                }
            }
        }

        self.owners.entry(to).or_default().extend(cells);
        moved
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.owners.clear();
        self.len = 0;
    }
}
