use super::test_consensus::TestConsensus;
use crate::model::stores::{ghostdag::GhostdagStoreReader, utxo_diffs::UtxoDiffsStoreReader};
use kaspad_consensus_core::{
    config::params::SIMNET_PARAMS,
    errors::block::RuleError,
    subnets::SUBNETWORK_ID_NATIVE,
    tx::{ScriptPublicKey, Transaction, TransactionInput, TransactionOutpoint, TransactionOutput},
};

fn spendable_params() -> kaspad_consensus_core::config::params::Params {
    let mut params = SIMNET_PARAMS.clone();
    params.coinbase_maturity = 0;
    params
}

#[test]
fn test_linear_chain() {
    // Mine 5 empty blocks along a single chain over genesis
    let tc = TestConsensus::new(SIMNET_PARAMS.clone());
    let genesis = tc.genesis_hash();
    let tip = tc.add_chain(genesis, 5);

    assert_eq!(tc.blue_score_of(tip), 5);
    assert_eq!(tc.consensus.get_block_count(), 6);

    let virtual_state = tc.consensus.get_virtual_state_snapshot();
    assert_eq!(virtual_state.parents, vec![tip]);
    assert_eq!(virtual_state.selected_parent(), tip);

    // Every mined block's coinbase has been accepted, leaving 5 coinbase
    // outputs in the virtual UTXO set
    assert_eq!(tc.consensus.get_virtual_utxo_count(), 5);
    let utxo_cache = tc.consensus.virtual_utxo_cache.read();
    assert!(utxo_cache.values().all(|entry| entry.is_coinbase));
}

#[test]
fn test_fork_and_merge() {
    let tc = TestConsensus::new(SIMNET_PARAMS.clone());
    let genesis = tc.genesis_hash();

    // Reach blue score 3, then fork
    let fork_point = tc.add_chain(genesis, 3);
    assert_eq!(tc.blue_score_of(fork_point), 3);

    let x = tc.add_block_with_parents(vec![fork_point]).unwrap();
    let y = tc.add_block_with_parents(vec![fork_point]).unwrap();
    assert_ne!(x, y);

    let m = tc.add_block_with_parents(vec![x, y]).unwrap();
    let m_data = tc.consensus.get_ghostdag_data(m).unwrap();

    // With equal work the tie breaks deterministically by hash
    let expected_selected = if x > y { x } else { y };
    assert_eq!(m_data.selected_parent, expected_selected);

    // Both siblings are blue and counted by the merging block
    assert_eq!(m_data.mergeset_blues.len(), 2);
    assert!(m_data.mergeset_blues.contains(&x) && m_data.mergeset_blues.contains(&y));
    assert_eq!(m_data.blue_score, tc.blue_score_of(expected_selected) + 2);
    assert!(m_data.mergeset_reds.is_empty());
}

#[test]
fn test_k_cluster_violation_marks_red() {
    // With k = 0 no two blocks may be in each other's anticone within the blue set
    let mut params = SIMNET_PARAMS.clone();
    params.ghostdag_k = 0;
    let tc = TestConsensus::new(params);
    let genesis = tc.genesis_hash();

    let x = tc.add_block_with_parents(vec![genesis]).unwrap();
    let y = tc.add_block_with_parents(vec![genesis]).unwrap();
    let m = tc.add_block_with_parents(vec![x, y]).unwrap();

    let m_data = tc.consensus.get_ghostdag_data(m).unwrap();
    // Only the selected parent may be blue; the sibling must be red
    assert_eq!(m_data.mergeset_blues.len(), 1);
    assert_eq!(m_data.mergeset_reds.len(), 1);
    assert_eq!(m_data.blue_score, 2); // genesis + selected parent
}

#[test]
fn test_blue_score_invariant() {
    // Invariant: blue_score(B) = blue_score(selected_parent(B)) + |mergeset_blues(B)|
    let tc = TestConsensus::new(SIMNET_PARAMS.clone());
    let genesis = tc.genesis_hash();

    let a = tc.add_block_with_parents(vec![genesis]).unwrap();
    let b = tc.add_block_with_parents(vec![genesis]).unwrap();
    let c = tc.add_block_with_parents(vec![a, b]).unwrap();
    let d = tc.add_block_with_parents(vec![c]).unwrap();

    for hash in [a, b, c, d] {
        let data = tc.consensus.get_ghostdag_data(hash).unwrap();
        let parent_score =
            if data.selected_parent == genesis { 0 } else { tc.blue_score_of(data.selected_parent) };
        assert_eq!(data.blue_score, parent_score + data.mergeset_blues.len() as u64);
    }
}

#[test]
fn test_first_window_difficulty_is_constant() {
    let tc = TestConsensus::new(SIMNET_PARAMS.clone());
    let genesis = tc.genesis_hash();
    let tip = tc.add_chain(genesis, 10);

    // Well below the difficulty window, so the expected bits stay at genesis level
    let virtual_state = tc.consensus.get_virtual_state_snapshot();
    assert_eq!(virtual_state.bits, SIMNET_PARAMS.genesis.bits);
    let header = tc.consensus.get_header(tip).unwrap();
    assert_eq!(header.bits, SIMNET_PARAMS.genesis.bits);
}

#[test]
fn test_reorg_switches_selected_chain() {
    let tc = TestConsensus::new(SIMNET_PARAMS.clone());
    let genesis = tc.genesis_hash();

    // A 3-block chain, then a heavier 5-block side chain
    let short_tip = tc.add_chain(genesis, 3);
    assert_eq!(tc.consensus.get_selected_tip_hash(), short_tip);

    let long_tip = tc.add_chain(genesis, 5);
    assert_eq!(tc.consensus.get_selected_tip_hash(), long_tip);

    // Both chain tips remain DAG tips
    let tips = tc.consensus.get_tips();
    assert!(tips.contains(&short_tip) && tips.contains(&long_tip));
}

#[test]
fn test_transaction_acceptance_updates_utxo() {
    let tc = TestConsensus::new(spendable_params());
    let genesis = tc.genesis_hash();

    // Mine a block and then a child making its coinbase spendable
    let b1 = tc.add_block_with_parents(vec![genesis]).unwrap();
    let b2 = tc.add_block_with_parents(vec![b1]).unwrap();

    // Locate b1's coinbase output in the virtual UTXO set
    let b1_coinbase_id = tc.consensus.get_block(b1).unwrap().transactions[0].id();
    let outpoint = TransactionOutpoint::new(b1_coinbase_id, 0);
    let entry = tc.consensus.get_virtual_utxo(&outpoint).expect("the coinbase output must be in the virtual utxo set");

    // Spend it: the miner pays to OpTrue so an empty signature script suffices
    let spend = Transaction::new(
        0,
        vec![TransactionInput::new(outpoint, vec![], 0)],
        vec![TransactionOutput::new(entry.amount - 1000, ScriptPublicKey::from_vec(0, vec![0x51]))],
        0,
        SUBNETWORK_ID_NATIVE,
        0,
        vec![],
    );
    let spend_id = spend.id();

    // Include the spend in a block, then mine a child to have it accepted
    let b3 = tc.add_block_with_parents_and_transactions(vec![b2], vec![spend]).unwrap();
    let b4 = tc.add_block_with_parents(vec![b3]).unwrap();

    // The spent outpoint is gone and the new output exists
    assert!(tc.consensus.get_virtual_utxo(&outpoint).is_none());
    assert!(tc.consensus.get_virtual_utxo(&TransactionOutpoint::new(spend_id, 0)).is_some());

    // The accepting block's diff records the spend
    let diff = tc.consensus.utxo_diffs_store.get(b4).unwrap();
    assert!(diff.remove.contains_key(&outpoint));
}

#[test]
fn test_double_spend_in_block_rejected() {
    let tc = TestConsensus::new(spendable_params());
    let genesis = tc.genesis_hash();
    let b1 = tc.add_block_with_parents(vec![genesis]).unwrap();
    let b2 = tc.add_block_with_parents(vec![b1]).unwrap();

    let b1_coinbase_id = tc.consensus.get_block(b1).unwrap().transactions[0].id();
    let outpoint = TransactionOutpoint::new(b1_coinbase_id, 0);
    let entry = tc.consensus.get_virtual_utxo(&outpoint).unwrap();

    let make_spend = |value: u64| {
        Transaction::new(
            0,
            vec![TransactionInput::new(outpoint, vec![], 0)],
            vec![TransactionOutput::new(value, ScriptPublicKey::from_vec(0, vec![0x51]))],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        )
    };

    let block = tc.build_block_with_parents(vec![b2], vec![make_spend(entry.amount - 1000), make_spend(entry.amount - 2000)]);
    let result = tc.consensus.validate_and_insert_block(block);
    assert!(matches!(result, Err(RuleError::DoubleSpendInSameBlock(_))));
}

#[test]
fn test_missing_parents_are_reported() {
    let tc = TestConsensus::new(SIMNET_PARAMS.clone());
    let genesis = tc.genesis_hash();
    let known = tc.add_block_with_parents(vec![genesis]).unwrap();

    // Craft a block citing an unknown parent alongside a known one. The header
    // commitments don't matter since the parents check precedes them, but the
    // block must still pass isolated validation.
    let mut block = tc.build_block_with_parents(vec![known], vec![]);
    let unknown = kaspad_hashes::Hash::from_u64_word(0x0bad);
    let mut header = (*block.header).clone();
    header.parents = vec![known, unknown];
    header.finalize();
    block.header = std::sync::Arc::new(header);

    match tc.consensus.validate_and_insert_block(block) {
        Err(RuleError::MissingParents(missing)) => assert_eq!(missing, vec![unknown]),
        other => panic!("expected missing parents, got {other:?}"),
    }

    // Missing parents must not get the block marked as invalid
    assert!(tc.consensus.get_block_status(unknown).is_none());
}

#[test]
fn test_duplicate_block_is_ignored() {
    let tc = TestConsensus::new(SIMNET_PARAMS.clone());
    let genesis = tc.genesis_hash();

    let block = tc.build_block_with_parents(vec![genesis], vec![]);
    let status = tc.consensus.validate_and_insert_block(block.clone()).unwrap();
    let again = tc.consensus.validate_and_insert_block(block).unwrap();
    assert_eq!(status, again);
    assert_eq!(tc.consensus.get_block_count(), 2);
}

#[test]
fn test_block_round_trips_through_flat_files() {
    let tc = TestConsensus::new(SIMNET_PARAMS.clone());
    let genesis = tc.genesis_hash();
    let hash = tc.add_block_with_parents(vec![genesis]).unwrap();

    let block = tc.consensus.get_block(hash).unwrap();
    assert_eq!(block.hash(), hash);
    assert_eq!(block.transactions.len(), 1);
    assert!(block.transactions[0].is_coinbase());
}

#[test]
fn test_locator_and_hashes_between() {
    let tc = TestConsensus::new(SIMNET_PARAMS.clone());
    let genesis = tc.genesis_hash();
    let tip = tc.add_chain(genesis, 30);

    let locator = tc.consensus.create_block_locator();
    assert_eq!(*locator.first().unwrap(), tip);
    assert_eq!(*locator.last().unwrap(), genesis);
    // Exponential spacing keeps the locator much shorter than the chain
    assert!(locator.len() < 25);

    let hashes = tc.consensus.get_hashes_between(genesis, tip, usize::MAX).unwrap();
    assert_eq!(hashes.len(), 30);
    assert_eq!(*hashes.last().unwrap(), tip);

    // The shared-block search picks the first known locator entry
    assert_eq!(tc.consensus.find_highest_shared_block(&locator), tip);
    let unknown = kaspad_hashes::Hash::from_u64_word(0xdead);
    assert_eq!(tc.consensus.find_highest_shared_block(&[unknown, genesis]), genesis);
}
