use crate::domain::models::TariffBracket;

/// One line of an invoice breakdown: the portion of the billed volume that
/// fell into a bracket, priced at that bracket's rate.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownLine {
    pub description: String,
    pub volume: f64,
    pub rate: f64,
    pub amount: f64,
}

/// Allocates a consumption volume across pricing brackets. Brackets are
/// assumed ordered by `min_volume`; a bracket without `max_volume` absorbs
/// everything remaining.
pub fn bill_breakdown(volume: f64, brackets: &[TariffBracket]) -> Vec<BreakdownLine> {
    let mut lines = Vec::new();
    let mut remaining = volume.max(0.0);

    for (index, bracket) in brackets.iter().enumerate() {
        if remaining <= 0.0 {
            break;
        }

        let span = bracket
            .max_volume
            .map(|max| (max - bracket.min_volume).max(0.0));
        let taken = span.map_or(remaining, |span| remaining.min(span));
        if taken <= 0.0 {
            continue;
        }

        let description = match (index, bracket.max_volume) {
            (0, Some(max)) => format!("First {max:.1} m3"),
            (_, Some(max)) => format!("Next {:.1} m3", max - bracket.min_volume),
            (_, None) => format!("Above {:.1} m3", bracket.min_volume),
        };

        lines.push(BreakdownLine {
            description,
            volume: taken,
            rate: bracket.price_per_cubic_meter,
            amount: taken * bracket.price_per_cubic_meter,
        });

        remaining -= taken;
    }

    lines
}
