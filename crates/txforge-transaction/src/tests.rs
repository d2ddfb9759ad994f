//! Tests for the txforge-transaction crate.
//!
//! Covers transaction parsing, serialization roundtrips, coinbase detection,
//! txid computation, both sighash algorithms, P2PKH signing, and the
//! builder's fee, dust, and change behavior.

use txforge_primitives::ec::{PrivateKey, PublicKey, Signature};
use txforge_script::interpreter::{verify_script, ScriptFlags};
use txforge_script::{Address, Network, Script};

use crate::amount::Amount;
use crate::builder::TxBuilder;
use crate::checker::TransactionSignatureChecker;
use crate::error::TransactionError;
use crate::input::{TransactionInput, DEFAULT_SEQUENCE_NUMBER};
use crate::outpoint::{OutPoint, Utxo};
use crate::output::TransactionOutput;
use crate::sighash;
use crate::template::{UnlockingScriptTemplate, P2PKH};
use crate::transaction::Transaction;

// -----------------------------------------------------------------------
// Raw transaction hex test vectors
// -----------------------------------------------------------------------

/// A standard transaction with one input and two outputs.
const SOURCE_RAW_TX: &str = "010000000138c7c61c14ffb063c3bb2664041a3e29ea6ea0412a0c18ff725ba4e9e12afae2030000006a47304402203e9ab8e4c14addf3b4741540b556cfb0e0efb67dc1a7b5ce84c3ac56b3fd447802203c9f49f7bd893ebd7060176dfc36bcaff9d2c443d9a0dd6cd2d59b372c024d20412102798913bc057b344de675dac34faafe3dc2f312c758cd9068209f810877306d66ffffffff02dc050000000000002076a914eb0bd5edba389198e73f8efabddfc61666969ff788ac6a0568656c6c6faa0d0000000000001976a914eb0bd5edba389198e73f8efabddfc61666969ff788ac00000000";

/// The locking script of the output SOURCE_RAW_TX spends.
const SOURCE_PREV_SCRIPT: &str = "76a914eb0bd5edba389198e73f8efabddfc61666969ff788ac";

/// A coinbase transaction hex.
const COINBASE_TX_HEX: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff17033f250d2f43555656452f2c903fb60859897700d02700ffffffff01d864a012000000001976a914d648686cf603c11850f39600e37312738accca8f88ac00000000";

/// A multi-input transaction.
const MULTI_INPUT_TX_HEX: &str = "0200000003a9bc457fdc6a54d99300fb137b23714d860c350a9d19ff0f571e694a419ff3a0010000006b48304502210086c83beb2b2663e4709a583d261d75be538aedcafa7766bd983e5c8db2f8b2fc02201a88b178624ab0ad1748b37c875f885930166237c88f5af78ee4e61d337f935f412103e8be830d98bb3b007a0343ee5c36daa48796ae8bb57946b1e87378ad6e8a090dfeffffff0092bb9a47e27bf64fc98f557c530c04d9ac25e2f2a8b600e92a0b1ae7c89c20010000006b483045022100f06b3db1c0a11af348401f9cebe10ae2659d6e766a9dcd9e3a04690ba10a160f02203f7fbd7dfcfc70863aface1a306fcc91bbadf6bc884c21a55ef0d32bd6b088c8412103e8be830d98bb3b007a0343ee5c36daa48796ae8bb57946b1e87378ad6e8a090dfeffffff9d0d4554fa692420a0830ca614b6c60f1bf8eaaa21afca4aa8c99fb052d9f398000000006b483045022100d920f2290548e92a6235f8b2513b7f693a64a0d3fa699f81a034f4b4608ff82f0220767d7d98025aff3c7bd5f2a66aab6a824f5990392e6489aae1e1ae3472d8dffb412103e8be830d98bb3b007a0343ee5c36daa48796ae8bb57946b1e87378ad6e8a090dfeffffff02807c814a000000001976a9143a6bf34ebfcf30e8541bbb33a7882845e5a29cb488ac76b0e60e000000001976a914bd492b67f90cb85918494767ebb23102c4f06b7088ac67000000";

/// Testnet WIF used by the P2PKH signing vectors.
const TEST_WIF: &str = "cNGwGSc7KRrTmdLUZ54fiSXWbhLNDc2Eg5zNucgQxyQCzuQ5YRDq";

fn test_key() -> PrivateKey {
    PrivateKey::from_wif(TEST_WIF).expect("should parse WIF")
}

fn address_for(key: &PrivateKey) -> Address {
    Address::from_public_key(&key.pub_key(), Network::Testnet)
}

fn parse(raw_hex: &str) -> Transaction {
    Transaction::from_hex(raw_hex).expect("test vector should parse")
}

fn script(script_hex: &str) -> Script {
    Script::from_hex(script_hex).expect("test script should parse")
}

/// Compute a sighash digest, panicking on failure.
fn digest(
    tx: &Transaction,
    input: u32,
    prev: &Script,
    sighash_type: u32,
    satoshis: u64,
    flags: ScriptFlags,
) -> [u8; 32] {
    sighash::signature_hash(tx, input, prev, sighash_type, satoshis, flags)
        .expect("sighash should succeed")
}

// -----------------------------------------------------------------------
// Transaction parsing and serialization
// -----------------------------------------------------------------------

#[test]
fn test_from_hex_roundtrip() {
    let tx = parse(SOURCE_RAW_TX);
    assert_eq!(
        (tx.version, tx.input_count(), tx.output_count(), tx.lock_time),
        (1, 1, 2, 0)
    );
    assert_eq!(tx.to_hex(), SOURCE_RAW_TX, "reserialization must be byte-identical");
}

#[test]
fn test_multi_input_roundtrip() {
    let tx = parse(MULTI_INPUT_TX_HEX);
    assert_eq!(
        (tx.version, tx.input_count(), tx.output_count(), tx.lock_time),
        (2, 3, 2, 0x67)
    );
    assert_eq!(tx.to_hex(), MULTI_INPUT_TX_HEX);
}

#[test]
fn test_from_bytes_roundtrip() {
    let original_bytes = hex::decode(SOURCE_RAW_TX).unwrap();
    let tx = Transaction::from_bytes(&original_bytes).expect("should parse from bytes");
    assert_eq!(tx.to_bytes(), original_bytes);
}

#[test]
fn test_parse_rejects_malformed_input() {
    // Trailing garbage after a complete transaction
    assert!(Transaction::from_hex(&format!("{}deadbeef", SOURCE_RAW_TX)).is_err());
    assert!(Transaction::from_hex("not_valid_hex").is_err());
    assert!(Transaction::from_bytes(&[]).is_err());
}

// -----------------------------------------------------------------------
// Transaction ID
// -----------------------------------------------------------------------

#[test]
fn test_tx_id() {
    let tx = parse(SOURCE_RAW_TX);

    let txid_hex = tx.tx_id_hex();
    assert_eq!(txid_hex.len(), 64);

    // The displayed txid is the internal hash byte-reversed.
    let mut reversed = tx.tx_id();
    reversed.reverse();
    assert_eq!(hex::encode(reversed), txid_hex);
}

// -----------------------------------------------------------------------
// Coinbase detection
// -----------------------------------------------------------------------

#[test]
fn test_is_coinbase() {
    let tx = parse(COINBASE_TX_HEX);
    assert!(tx.is_coinbase(), "should detect coinbase transaction");
    assert_eq!(tx.fee(), Some(0), "coinbase pays no fee");
}

/// The genesis block's coinbase parses, detects as coinbase, and pays no
/// fee despite its unknown input value.
#[test]
fn test_genesis_coinbase() {
    let genesis_hex = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff0704ffff001d0104ffffffff0100f2052a0100000043410496b538e853519c726a2c91e61ec11600ae1390813a627c66fb8be7947be63c52da7589379515d4e0a604f8141781e62294721166bf621e73a82cbf2342c858eeac00000000";
    let tx = parse(genesis_hex);
    assert!(tx.is_coinbase());
    assert_eq!(tx.fee(), Some(0));
    assert_eq!(tx.to_hex(), genesis_hex, "roundtrip must be byte-identical");
}

#[test]
fn test_is_not_coinbase() {
    let tx = parse(SOURCE_RAW_TX);
    assert!(!tx.is_coinbase());
    assert_eq!(tx.fee(), None, "fee is unknown without source outputs");
}

/// A zero txid alone is not a coinbase marker; the output index must also
/// be the null-outpoint index, regardless of the sequence number.
#[test]
fn test_zero_txid_with_real_index_is_not_coinbase() {
    let mut tx = Transaction::new();
    let input = TransactionInput::new([0u8; 32], 3);
    assert_eq!(input.sequence_number, DEFAULT_SEQUENCE_NUMBER);
    tx.add_input(input);
    tx.add_output(TransactionOutput::new(1000, Script::new()));

    assert!(!tx.is_coinbase(), "index 3 must not classify as coinbase");
    assert_eq!(tx.fee(), None, "fee stays unknown for a non-coinbase spend");
}

// -----------------------------------------------------------------------
// Transaction building
// -----------------------------------------------------------------------

#[test]
fn test_new_transaction() {
    let mut tx = Transaction::new();
    assert_eq!((tx.version, tx.lock_time), (1, 0));
    assert_eq!((tx.input_count(), tx.output_count()), (0, 0));

    let input = TransactionInput::new([0xab; 32], 0);
    assert_eq!(input.sequence_number, DEFAULT_SEQUENCE_NUMBER);
    tx.add_input(input);
    tx.add_output(TransactionOutput::new(
        50000,
        Script::from_bytes(vec![0x76, 0xa9, 0x14]),
    ));
    assert_eq!((tx.input_count(), tx.output_count()), (1, 1));
}

#[test]
fn test_empty_transaction_serialization() {
    // version(4) + varint(0 inputs)(1) + varint(0 outputs)(1) + locktime(4)
    let bytes = Transaction::new().to_bytes();
    assert_eq!(bytes.len(), 10);

    let roundtrip = Transaction::from_bytes(&bytes).expect("should parse empty tx");
    assert_eq!((roundtrip.version, roundtrip.lock_time), (1, 0));
    assert_eq!((roundtrip.input_count(), roundtrip.output_count()), (0, 0));
}

/// size() is computed from the field lengths, not by serializing, and must
/// agree with the serialized length exactly.
#[test]
fn test_transaction_size() {
    for raw_hex in [SOURCE_RAW_TX, MULTI_INPUT_TX_HEX, COINBASE_TX_HEX] {
        let tx = parse(raw_hex);
        assert_eq!(tx.size(), raw_hex.len() / 2, "size() must match byte length");
    }
    assert_eq!(Transaction::new().size(), 10);
}

// -----------------------------------------------------------------------
// Output and input properties
// -----------------------------------------------------------------------

#[test]
fn test_output_satoshis() {
    let tx = parse(SOURCE_RAW_TX);
    assert_eq!(tx.outputs[0].satoshis, 1500);
    assert_eq!(tx.outputs[1].satoshis, 3498);
    assert_eq!(tx.total_output_satoshis(), 1500 + 3498);
}

#[test]
fn test_output_locking_script_hex() {
    let tx = parse(SOURCE_RAW_TX);
    assert_eq!(tx.outputs[1].locking_script_hex(), SOURCE_PREV_SCRIPT);
}

#[test]
fn test_input_wire_fields() {
    let tx = parse(SOURCE_RAW_TX);
    let input = &tx.inputs[0];

    assert_eq!(input.sequence_number, DEFAULT_SEQUENCE_NUMBER);

    // The source txid is kept in wire byte order, exactly as it appears
    // in the raw hex.
    let expected =
        hex::decode("38c7c61c14ffb063c3bb2664041a3e29ea6ea0412a0c18ff725ba4e9e12afae2").unwrap();
    assert_eq!(&input.source_txid[..], &expected[..]);
    assert_eq!(input.source_tx_out_index, 3);
}

// -----------------------------------------------------------------------
// Sighash: fork-id algorithm
// -----------------------------------------------------------------------

#[test]
fn test_signature_hash_forkid_basic() {
    let tx = parse(SOURCE_RAW_TX);
    let hash = digest(
        &tx,
        0,
        &script(SOURCE_PREV_SCRIPT),
        sighash::SIGHASH_ALL | sighash::SIGHASH_FORKID,
        1500,
        ScriptFlags::ENABLE_SIGHASH_FORKID,
    );
    assert_eq!(hash.len(), 32);
}

#[test]
fn test_signature_hash_out_of_range() {
    let tx = parse(SOURCE_RAW_TX);
    let result = sighash::signature_hash(
        &tx,
        99,
        &Script::new(),
        sighash::SIGHASH_ALL_FORKID,
        0,
        ScriptFlags::ENABLE_SIGHASH_FORKID,
    );
    assert!(result.is_err(), "should error on out-of-range input index");
}

#[test]
fn test_calc_preimage_structure() {
    let tx = parse(SOURCE_RAW_TX);
    let prev_script = script(SOURCE_PREV_SCRIPT);
    let sighash_type = sighash::SIGHASH_ALL | sighash::SIGHASH_FORKID;

    let preimage = sighash::calc_preimage(&tx, 0, &prev_script, sighash_type, 1500)
        .expect("preimage should succeed");

    // version(4) + hashPrevouts(32) + hashSequence(32) + outpoint(36) +
    // scriptCode(varint + script) + value(8) + nSequence(4) + hashOutputs(32) +
    // locktime(4) + sighashType(4)
    let expected_len = 4 + 32 + 32 + 36 + 1 + prev_script.len() + 8 + 4 + 32 + 4 + 4;
    assert_eq!(preimage.len(), expected_len);

    // The preimage starts with the version and ends with the sighash type,
    // both little-endian.
    assert_eq!(preimage[..4], 1u32.to_le_bytes());
    assert_eq!(preimage[preimage.len() - 4..], sighash_type.to_le_bytes());
}

// -----------------------------------------------------------------------
// Sighash: legacy algorithm
// -----------------------------------------------------------------------

#[test]
fn test_legacy_sighash_is_deterministic() {
    let tx = parse(SOURCE_RAW_TX);
    let prev = script(SOURCE_PREV_SCRIPT);

    let a = digest(&tx, 0, &prev, sighash::SIGHASH_ALL, 1500, ScriptFlags::NONE);
    let b = digest(&tx, 0, &prev, sighash::SIGHASH_ALL, 1500, ScriptFlags::NONE);
    assert_eq!(a, b, "same input must hash to the same digest");
}

/// The fork-id bit only selects the fork-id algorithm when the interpreter
/// flags enable it; otherwise the legacy algorithm runs with the same type.
#[test]
fn test_forkid_bit_requires_enabling_flag() {
    let tx = parse(SOURCE_RAW_TX);
    let prev = script(SOURCE_PREV_SCRIPT);
    let sighash_type = sighash::SIGHASH_ALL_FORKID;

    let forkid = digest(&tx, 0, &prev, sighash_type, 1500, ScriptFlags::ENABLE_SIGHASH_FORKID);
    let legacy = digest(&tx, 0, &prev, sighash_type, 1500, ScriptFlags::NONE);
    assert_ne!(forkid, legacy, "the two algorithms must produce different digests");
}

/// SIGHASH_SINGLE with an input index past the last output historically
/// returns a constant digest of one instead of failing.
#[test]
fn test_legacy_single_out_of_range_sentinel() {
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::new([0xaa; 32], 0));
    tx.add_input(TransactionInput::new([0xbb; 32], 1));
    tx.add_output(TransactionOutput::new(1000, Script::new()));

    let sentinel = "0000000000000000000000000000000000000000000000000000000000000001";

    // Input 1 has no matching output.
    let out_of_range = digest(&tx, 1, &Script::new(), sighash::SIGHASH_SINGLE, 0, ScriptFlags::NONE);
    assert_eq!(hex::encode(out_of_range), sentinel);

    // Input 0 does, so it hashes normally.
    let in_range = digest(&tx, 0, &Script::new(), sighash::SIGHASH_SINGLE, 0, ScriptFlags::NONE);
    assert_ne!(hex::encode(in_range), sentinel);
}

#[test]
fn test_legacy_base_types_differ() {
    let tx = parse(MULTI_INPUT_TX_HEX);
    let prev = script("76a9143a6bf34ebfcf30e8541bbb33a7882845e5a29cb488ac");

    let all = digest(&tx, 0, &prev, sighash::SIGHASH_ALL, 0, ScriptFlags::NONE);
    let none = digest(&tx, 0, &prev, sighash::SIGHASH_NONE, 0, ScriptFlags::NONE);
    let anyone = digest(
        &tx,
        0,
        &prev,
        sighash::SIGHASH_ALL | sighash::SIGHASH_ANYONECANPAY,
        0,
        ScriptFlags::NONE,
    );

    assert_ne!(all, none);
    assert_ne!(all, anyone);
    assert_ne!(none, anyone);
}

// -----------------------------------------------------------------------
// P2PKH signing - end-to-end vectors
// -----------------------------------------------------------------------

/// Signing the reference unsigned transaction must reproduce the known
/// signed hex byte-for-byte.
#[test]
fn test_p2pkh_sign_exact_match() {
    let incomplete_tx_hex = "010000000193a35408b6068499e0d5abd799d3e827d9bfe70c9b75ebe209c91d25072326510000000000ffffffff02404b4c00000000001976a91404ff367be719efa79d76e4416ffb072cd53b208888acde94a905000000001976a91404d03f746652cfcb6cb55119ab473a045137d26588ac00000000";
    let mut tx = parse(incomplete_tx_hex);

    tx.inputs[0].set_source_output(TransactionOutput::new(
        100_000_000,
        script("76a914c0a3c167a28cabb9fbb495affa0761e6e74ac60d88ac"),
    ));

    let unlocker = P2PKH::unlock(test_key(), None);
    tx.inputs[0].unlocking_script = Some(unlocker.sign(&tx, 0).expect("signing should succeed"));

    let expected_signed_tx = "010000000193a35408b6068499e0d5abd799d3e827d9bfe70c9b75ebe209c91d2507232651000000006b483045022100c1d77036dc6cd1f3fa1214b0688391ab7f7a16cd31ea4e5a1f7a415ef167df820220751aced6d24649fa235132f1e6969e163b9400f80043a72879237dab4a1190ad412103b8b40a84123121d260f5c109bc5a46ec819c2e4002e5ba08638783bfb4e01435ffffffff02404b4c00000000001976a91404ff367be719efa79d76e4416ffb072cd53b208888acde94a905000000001976a91404d03f746652cfcb6cb55119ab473a045137d26588ac00000000";
    assert_eq!(
        tx.to_hex(),
        expected_signed_tx,
        "signed tx hex must match the reference output byte-for-byte"
    );
}

/// The produced signature must verify against the digest it commits to.
#[test]
fn test_p2pkh_valid_signature() {
    let mut tx = Transaction::new();
    tx.add_input_from(
        "45be95d2f2c64e99518ffbbce03fb15a7758f20ee5eecf0df07938d977add71d",
        0,
        "76a914c7c6987b6e2345a6b138e3384141520a0fbc18c588ac",
        15564838601,
    )
    .expect("should add input");
    tx.add_output(TransactionOutput::new(
        375041432,
        script("76a91442f9682260509ac80722b1963aec8a896593d16688ac"),
    ));
    tx.add_output(TransactionOutput::new(
        15189796941,
        script("76a914c36538e91213a8100dcb2aed456ade363de8483f88ac"),
    ));

    let unlocker = P2PKH::unlock(test_key(), None);
    tx.inputs[0].unlocking_script = Some(unlocker.sign(&tx, 0).expect("signing should succeed"));

    // The unlocking script is exactly two pushes: signature then pubkey.
    let operands: Vec<_> = tx.inputs[0]
        .unlocking_script
        .as_ref()
        .unwrap()
        .operands()
        .collect();
    assert_eq!(operands.len(), 2);

    let sig_bytes = operands[0].data.as_ref().expect("sig push should have data");
    let pubkey_bytes = operands[1].data.as_ref().expect("pubkey push should have data");

    let public_key = PublicKey::from_bytes(pubkey_bytes).expect("should parse public key");
    // The last byte of sig_bytes is the sighash flag; the rest is DER.
    let sig = Signature::from_der(&sig_bytes[..sig_bytes.len() - 1])
        .expect("should parse DER signature");

    let sig_hash = tx
        .calc_input_signature_hash(
            0,
            sighash::SIGHASH_ALL_FORKID,
            ScriptFlags::ENABLE_SIGHASH_FORKID,
        )
        .expect("should compute sighash");

    assert!(sig.verify(&sig_hash, &public_key));
}

/// Signing the same input twice yields the same script: signatures are
/// deterministic.
#[test]
fn test_p2pkh_sign_is_deterministic() {
    let mut tx = Transaction::new();
    tx.add_input_from(
        "45be95d2f2c64e99518ffbbce03fb15a7758f20ee5eecf0df07938d977add71d",
        0,
        "76a914c7c6987b6e2345a6b138e3384141520a0fbc18c588ac",
        15564838601,
    )
    .expect("should add input");
    tx.add_output(TransactionOutput::new(
        375041432,
        script("76a91442f9682260509ac80722b1963aec8a896593d16688ac"),
    ));

    let unlocker = P2PKH::unlock(test_key(), None);
    let first = unlocker.sign(&tx, 0).expect("signing should succeed");
    let second = unlocker.sign(&tx, 0).expect("signing should succeed");
    assert_eq!(first.to_bytes(), second.to_bytes());
}

#[test]
fn test_p2pkh_source_output_requirement() {
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::new([0x1d; 32], 0));
    tx.add_output(TransactionOutput::new(
        375041432,
        script("76a91442f9682260509ac80722b1963aec8a896593d16688ac"),
    ));

    // Without source output info signing has no value to commit to.
    let unlocker = P2PKH::unlock(test_key(), None);
    assert!(unlocker.sign(&tx, 0).is_err());

    // With it, signing succeeds.
    tx.inputs[0].set_source_output(TransactionOutput::new(
        15564838601,
        script("76a914c7c6987b6e2345a6b138e3384141520a0fbc18c588ac"),
    ));
    let uscript = unlocker.sign(&tx, 0).expect("signing should succeed");
    assert!(!uscript.is_empty());
}

// -----------------------------------------------------------------------
// Builder: fee, dust, and change
// -----------------------------------------------------------------------

const UTXO_TXID: &str = "45be95d2f2c64e99518ffbbce03fb15a7758f20ee5eecf0df07938d977add71d";

fn p2pkh_utxo(satoshis: u64, key: &PrivateKey) -> Utxo {
    let address = address_for(key);
    Utxo::new(
        OutPoint::from_hex(UTXO_TXID, 0).unwrap(),
        satoshis,
        P2PKH::lock(&address),
    )
}

/// Spending 1,000,000 and paying 500,000 at 100,000/KB yields a 226-byte
/// estimate, a 22,600 fee, and 477,400 change.
#[test]
fn test_builder_change_amount() {
    let key = test_key();
    let dest = address_for(&PrivateKey::from_hex(
        "0000000000000000000000000000000000000000000000000000000000000002",
    )
    .unwrap());
    let change = address_for(&key);

    let mut builder = TxBuilder::new();
    builder
        .spend_from_utxo(p2pkh_utxo(1_000_000, &key))
        .spend_to_address(&dest, Amount(500_000))
        .unwrap()
        .send_change_to(&change)
        .with_fee_per_kb(100_000)
        .sign(key);

    assert_eq!(builder.estimated_size(), 226);
    assert_eq!(builder.estimated_fee(), 22_600);

    let tx = builder.finalize().expect("build should succeed");
    assert_eq!(tx.output_count(), 2, "payment plus change");
    assert_eq!(tx.outputs[1].satoshis, 477_400, "change absorbs the rest");
    assert!(tx.outputs[1].change, "second output is flagged as change");
    assert_eq!(tx.fee(), Some(22_600));
}

/// A small leftover with no change destination is accepted as the fee.
#[test]
fn test_builder_leftover_as_fee() {
    let key = test_key();
    let dest = address_for(&key);

    let mut builder = TxBuilder::new();
    builder
        .spend_from_utxo(p2pkh_utxo(100_000, &key))
        .spend_to_address(&dest, Amount(99_000))
        .unwrap()
        .sign(key);

    let tx = builder.finalize().expect("build should succeed");
    assert_eq!(tx.output_count(), 1, "no change output");
    assert_eq!(tx.fee(), Some(1_000), "the leftover becomes the fee");
}

/// A large leftover with no change destination is a burn, not a fee.
#[test]
fn test_builder_rejects_burned_leftover() {
    let key = test_key();
    let dest = address_for(&key);

    let mut builder = TxBuilder::new();
    builder
        .spend_from_utxo(p2pkh_utxo(100_000_000, &key))
        .spend_to_address(&dest, Amount(1_000_000))
        .unwrap();

    let err = builder.finalize().unwrap_err();
    assert!(
        matches!(err, TransactionError::FeeError(_)),
        "must fail without a change destination, got {err:?}"
    );
}

/// Paying zero or a negative amount fails at the call site.
#[test]
fn test_builder_rejects_nonpositive_amount() {
    let key = test_key();
    let dest = address_for(&key);

    let mut builder = TxBuilder::new();
    let err = builder.spend_to_address(&dest, Amount(0)).unwrap_err();
    assert!(matches!(err, TransactionError::AmountError(_)));

    let err = builder.spend_to_address(&dest, Amount(-5)).unwrap_err();
    assert!(matches!(err, TransactionError::AmountError(_)));
}

/// Adding the same outpoint twice spends it once.
#[test]
fn test_builder_utxo_idempotence() {
    let key = test_key();
    let dest = address_for(&key);

    let mut builder = TxBuilder::new();
    builder
        .spend_from_utxo(p2pkh_utxo(100_000, &key))
        .spend_from_utxo(p2pkh_utxo(100_000, &key))
        .spend_to_address(&dest, Amount(99_000))
        .unwrap()
        .sign(key);

    let tx = builder.finalize().expect("build should succeed");
    assert_eq!(tx.input_count(), 1, "duplicate outpoint must not be added");
}

/// Outputs below the dust limit are rejected at build time.
#[test]
fn test_builder_rejects_dust_output() {
    let key = test_key();
    let dest = address_for(&key);

    let mut builder = TxBuilder::new();
    builder
        .spend_from_utxo(p2pkh_utxo(100_000, &key))
        .spend_to_address(&dest, Amount(545))
        .unwrap()
        .send_change_to(&dest);

    let err = builder.finalize().unwrap_err();
    assert!(matches!(err, TransactionError::DustOutput(545, 546)));
}

/// Zero-value data outputs are exempt from the dust rule.
#[test]
fn test_builder_allows_data_output() {
    let key = test_key();
    let dest = address_for(&key);

    let mut builder = TxBuilder::new();
    builder
        .spend_from_utxo(p2pkh_utxo(100_000, &key))
        .spend_to_address(&dest, Amount(99_000))
        .unwrap()
        .add_data(&[b"hello"])
        .unwrap()
        .sign(key);

    let tx = builder.finalize().expect("build should succeed");
    assert_eq!(tx.output_count(), 2);
    assert_eq!(tx.outputs[1].satoshis, 0);
    assert!(tx.outputs[1].is_null_data());
}

/// Change that would fall below the dust limit is dropped into the fee.
#[test]
fn test_builder_omits_dust_change() {
    let key = test_key();
    let dest = address_for(&key);

    let mut builder = TxBuilder::new();
    builder
        .spend_from_utxo(p2pkh_utxo(100_000, &key))
        .spend_to_address(&dest, Amount(99_500))
        .unwrap()
        .send_change_to(&dest)
        .with_fee(400)
        .sign(key);

    // Change would be 100 sats, below the dust limit.
    let tx = builder.finalize().expect("build should succeed");
    assert_eq!(tx.output_count(), 1, "dust change must be omitted");
    assert_eq!(tx.fee(), Some(500), "dust change is absorbed into the fee");
}

/// An explicit fee overrides the rate-derived estimate.
#[test]
fn test_builder_explicit_fee() {
    let key = test_key();
    let dest = address_for(&key);

    let mut builder = TxBuilder::new();
    builder
        .spend_from_utxo(p2pkh_utxo(100_000, &key))
        .spend_to_address(&dest, Amount(90_000))
        .unwrap()
        .send_change_to(&dest)
        .with_fee(1_000)
        .sign(key);

    let tx = builder.finalize().expect("build should succeed");
    assert_eq!(tx.outputs[1].satoshis, 9_000);
    assert_eq!(tx.fee(), Some(1_000));
}

/// Spending more than the inputs hold fails.
#[test]
fn test_builder_insufficient_funds() {
    let key = test_key();
    let dest = address_for(&key);

    let mut builder = TxBuilder::new();
    builder
        .spend_from_utxo(p2pkh_utxo(10_000, &key))
        .spend_to_address(&dest, Amount(20_000))
        .unwrap();

    let err = builder.finalize().unwrap_err();
    assert!(matches!(err, TransactionError::FeeError(_)));
}

#[test]
fn test_builder_requires_inputs() {
    let builder = TxBuilder::new();
    let err = builder.finalize().unwrap_err();
    assert!(matches!(err, TransactionError::InvalidTransaction(_)));
}

// -----------------------------------------------------------------------
// End-to-end: built transaction passes script verification
// -----------------------------------------------------------------------

/// A builder-signed P2PKH input must satisfy the interpreter when checked
/// with the matching signature checker.
#[test]
fn test_signed_input_verifies() {
    let key = test_key();
    let dest = address_for(&key);
    let utxo = p2pkh_utxo(100_000, &key);
    let locking_script = utxo.locking_script.clone();

    let mut builder = TxBuilder::new();
    builder
        .spend_from_utxo(utxo)
        .spend_to_address(&dest, Amount(99_000))
        .unwrap()
        .sign(key);

    let tx = builder.finalize().expect("build should succeed");
    let unlocking_script = tx.inputs[0]
        .unlocking_script
        .as_ref()
        .expect("input should be signed");

    let checker = TransactionSignatureChecker::new(&tx, 0, 100_000);
    let (ok, code) = verify_script(
        unlocking_script,
        &locking_script,
        ScriptFlags::ENABLE_SIGHASH_FORKID,
        Some(&checker),
    );
    assert!(ok, "script verification failed with code {code:?}");
}
