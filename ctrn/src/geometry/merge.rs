//! Fusion de lignes par leurs extrémités

use super::Coord3;

/// Fusionne des lignes dont les extrémités se touchent
///
/// Une ligne est prolongée tant qu'une autre partage l'une de ses extrémités
/// (à `tolerance` près). Les lignes qui ne touchent rien restent séparées.
pub fn merge_lines(lines: Vec<Vec<Coord3>>, tolerance: f64) -> Vec<Vec<Coord3>> {
    let mut remaining: Vec<Vec<Coord3>> = lines.into_iter().filter(|l| !l.is_empty()).collect();
    // Ordre d'entrée conservé: la première ligne sert de graine
    remaining.reverse();
    let mut merged = Vec::new();

    while let Some(mut line) = remaining.pop() {
        let mut made_progress = true;
        while made_progress && !remaining.is_empty() {
            made_progress = false;
            let line_first = line[0];
            let line_last = line[line.len() - 1];

            for i in (0..remaining.len()).rev() {
                let other = &remaining[i];
                let other_first = other[0];
                let other_last = other[other.len() - 1];

                if touches(line_last, other_first, tolerance) {
                    // Cas 1: prolongement direct
                    let other = remaining.remove(i);
                    line.extend(other.into_iter().skip(1));
                    made_progress = true;
                    break;
                } else if touches(line_last, other_last, tolerance) {
                    // Cas 2: prolongement par l'autre ligne inversée
                    let other = remaining.remove(i);
                    line.extend(other.into_iter().rev().skip(1));
                    made_progress = true;
                    break;
                } else if touches(line_first, other_last, tolerance) {
                    // Cas 3: l'autre ligne précède
                    let mut head = remaining.remove(i);
                    head.pop();
                    head.extend(line);
                    line = head;
                    made_progress = true;
                    break;
                } else if touches(line_first, other_first, tolerance) {
                    // Cas 4: l'autre ligne inversée précède
                    let other = remaining.remove(i);
                    let mut head: Vec<Coord3> = other.into_iter().rev().collect();
                    head.pop();
                    head.extend(line);
                    line = head;
                    made_progress = true;
                    break;
                }
            }
        }
        merged.push(line);
    }

    merged
}

/// Deux extrémités se touchent (égalité exacte ou à la tolérance près)
fn touches(a: Coord3, b: Coord3, tolerance: f64) -> bool {
    (a.x == b.x && a.y == b.y) || ((a.x - b.x).abs() < tolerance && (a.y - b.y).abs() < tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64)]) -> Vec<Coord3> {
        points.iter().map(|&(x, y)| Coord3::new(x, y, 0.0)).collect()
    }

    #[test]
    fn test_merge_end_to_start() {
        let merged = merge_lines(
            vec![line(&[(0.0, 0.0), (1.0, 0.0)]), line(&[(1.0, 0.0), (2.0, 0.0)])],
            1e-9,
        );
        assert_eq!(merged, vec![line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])]);
    }

    #[test]
    fn test_merge_reversed_head() {
        // La seconde ligne est digitalisée dans l'autre sens et précède la première
        let merged = merge_lines(
            vec![line(&[(1.0, 0.0), (2.0, 0.0)]), line(&[(1.0, 0.0), (0.0, 0.0)])],
            1e-9,
        );
        assert_eq!(merged, vec![line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])]);
    }

    #[test]
    fn test_merge_within_tolerance() {
        let merged = merge_lines(
            vec![line(&[(0.0, 0.0), (1.0, 0.0)]), line(&[(1.4, 0.3), (2.0, 0.0)])],
            0.5,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].len(), 3);
    }

    #[test]
    fn test_disjoint_lines_stay_apart() {
        let merged = merge_lines(
            vec![line(&[(0.0, 0.0), (1.0, 0.0)]), line(&[(5.0, 5.0), (6.0, 5.0)])],
            1.0,
        );
        assert_eq!(merged.len(), 2);
    }
}
