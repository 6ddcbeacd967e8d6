//! Property tests for container round trips through the simulated server.

use proptest::prelude::*;
use spfe_client::{ContainerOptions, GetTicketOptions};
use spfe_harness::{SimConfig, SimSpfe};
use spfe_proto::Encoding;

fn any_encoding() -> impl Strategy<Value = Encoding> {
    prop_oneof![Just(Encoding::Plain), Just(Encoding::Base64)]
}

/// Text mixing Latin, Cyrillic, CJK, Arabic, emoji and XML-special characters.
fn multi_script_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-zA-Z0-9 ]{1,8}",
            "[а-яА-Я]{1,8}",
            "[一-龥]{1,4}",
            "[ا-ي]{1,6}",
            Just("😀🚀".to_string()),
            Just("<&>\"'".to_string()),
            Just("+%=&?".to_string()),
        ],
        0..12,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn text_written_is_text_read(
        text in multi_script_text(),
        container in "[a-z]{0,16}",
        encoding in any_encoding(),
    ) {
        let sim = SimSpfe::with_config(SimConfig { encoding, ..SimConfig::default() });
        let client = sim.client();
        let ticket = client.get_ticket(&GetTicketOptions::default()).unwrap().ticket;
        let options = ContainerOptions::named(container);

        client.write_data(&ticket, text.as_str(), &options).unwrap();
        let read = client.read_data(&ticket, &options).unwrap();

        prop_assert_eq!(read.into_text().unwrap(), text);
    }

    #[test]
    fn bytes_written_are_bytes_read(
        bytes in prop::collection::vec(any::<u8>(), 0..256),
        encoding in any_encoding(),
    ) {
        let sim = SimSpfe::with_config(SimConfig { encoding, ..SimConfig::default() });
        let client = sim.client();
        let pfid = client.create_pfid().unwrap();

        client.write_data_sp(&pfid, bytes.clone()).unwrap();

        prop_assert_eq!(client.read_data_sp(&pfid).unwrap().into_bytes(), bytes);
    }
}
