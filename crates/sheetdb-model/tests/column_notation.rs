use proptest::prelude::*;
use sheetdb_model::{
    cell_range, column_index, column_letter, column_range, row_span_range, SheetRange, MAX_COLUMNS,
};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn letters_round_trip(index in 0u32..MAX_COLUMNS * 4) {
        let letters = column_letter(index);
        prop_assert!(letters.bytes().all(|b| b.is_ascii_uppercase()));
        prop_assert_eq!(column_index(&letters).unwrap(), index);
        prop_assert_eq!(column_index(&letters.to_ascii_lowercase()).unwrap(), index);
    }

    #[test]
    fn letters_sort_like_indices(a in 0u32..MAX_COLUMNS, b in 0u32..MAX_COLUMNS) {
        let (la, lb) = (column_letter(a), column_letter(b));
        // Shorter names come first, equal-length names compare lexically.
        let letter_order = la.len().cmp(&lb.len()).then_with(|| la.cmp(&lb));
        prop_assert_eq!(letter_order, a.cmp(&b));
    }

    #[test]
    fn built_ranges_parse_back(col in 0u32..1000, first in 1u32..5000, extra in 0u32..50) {
        let last = first + extra;

        let column = SheetRange::parse(&column_range("Data", col)).unwrap();
        prop_assert_eq!(column.sheet.as_deref(), Some("Data"));
        prop_assert_eq!(column.first_col(), col);
        prop_assert_eq!(column.last_col(), Some(col));
        prop_assert_eq!(column.last_row(), None);

        let span = SheetRange::parse(&row_span_range("My Data", first, last, col)).unwrap();
        prop_assert_eq!(span.sheet.as_deref(), Some("My Data"));
        prop_assert_eq!(span.first_row(), first - 1);
        prop_assert_eq!(span.last_row(), Some(last - 1));
        prop_assert_eq!(span.first_col(), 0);
        prop_assert_eq!(span.last_col(), Some(col));

        let cell = SheetRange::parse(&cell_range("Data", col, first)).unwrap();
        prop_assert_eq!(cell.start, cell.end);
    }
}

#[test]
fn documented_letters() {
    for (index, letters) in [(0, "A"), (25, "Z"), (26, "AA"), (51, "AZ"), (18_277, "ZZZ")] {
        assert_eq!(column_letter(index), letters);
    }
}
