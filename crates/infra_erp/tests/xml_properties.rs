//! Property tests for the import document layout

use proptest::option;
use proptest::prelude::*;
use rust_decimal_macros::dec;

use infra_erp::{generate_invoice_xml, Invoice, InvoiceItem};
use test_utils::{IdFixtures, TemporalFixtures};

const HEADER_ORDER: [&str; 7] = [
    "items",
    "supplier",
    "defaultStore",
    "conception",
    "documentNumber",
    "dateIncoming",
    "externalId",
];

const ITEM_ORDER: [&str; 5] = ["productId", "amount", "price", "sum", "storeId"];

/// Offsets of the tags present in `xml`, in the given order
fn offsets(xml: &str, tags: &[&str]) -> Vec<usize> {
    tags.iter()
        .filter_map(|tag| xml.find(&format!("<{}>", tag)))
        .collect()
}

fn is_increasing(positions: &[usize]) -> bool {
    positions.windows(2).all(|pair| pair[0] < pair[1])
}

proptest! {
    #[test]
    fn element_order_holds_for_any_optional_fields(
        conception in option::of(Just(IdFixtures::CONCEPTION)),
        document_number in option::of("[A-Z]{2,4}-[0-9]{1,5}"),
        days_ago in option::of(0i64..30),
        store in option::of(Just(IdFixtures::STORE)),
        lines in 1usize..4,
    ) {
        let items: Vec<InvoiceItem> = (1..=lines)
            .map(|num| {
                let item = InvoiceItem::new(num as u32, IdFixtures::BEEF, dec!(2), dec!(12000), dec!(24000));
                match store {
                    Some(store_id) => item.with_store(store_id),
                    None => item,
                }
            })
            .collect();

        let mut invoice = Invoice::new(items, IdFixtures::SUPPLIER, IdFixtures::STORE);
        if let Some(conception_id) = conception {
            invoice = invoice.with_conception(conception_id);
        }
        if let Some(number) = &document_number {
            invoice = invoice.with_document_number(number.clone());
        }
        if let Some(days) = days_ago {
            invoice = invoice.with_date_incoming(TemporalFixtures::in_days(-days));
        }

        let xml = generate_invoice_xml(&invoice).unwrap();

        let expected_header = 4
            + usize::from(conception.is_some())
            + usize::from(document_number.is_some())
            + usize::from(days_ago.is_some());
        let header = offsets(&xml, &HEADER_ORDER);
        prop_assert_eq!(header.len(), expected_header, "{}", xml);
        prop_assert!(is_increasing(&header), "{}", xml);

        let item_blocks: Vec<&str> = xml.split("<item>").skip(1).collect();
        prop_assert_eq!(item_blocks.len(), lines);
        for block in item_blocks {
            let block = &block[..block.find("</item>").unwrap()];
            let fields = offsets(block, &ITEM_ORDER);
            prop_assert_eq!(fields.len(), 4 + usize::from(store.is_some()), "{}", block);
            prop_assert!(is_increasing(&fields), "{}", block);
        }
    }
}
