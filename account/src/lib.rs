// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Onyx Account: Identity and Registration
//!
//! Everything between "here is a recovery phrase" and "this device has a
//! registered account": the phrase codec, the keys it unlocks, where those
//! keys are kept, and the two flows that put them there (register a new
//! account, or link this device to an existing one).
//!
//! ## Architecture
//!
//! - **mnemonic**: Recovery phrases. 13 words in, 32 hex chars out. And back.
//! - **crypto**: Seed to Ed25519 to X25519. One seed, one identity, forever.
//! - **identity**: Account ids and display names. What your contacts see.
//! - **storage**: The account key-value store over sled, and an in-memory one for tests.
//! - **conversation**: Just enough conversation list for Note To Self.
//! - **sync**: Profile discovery for linked devices, config sync bootstrap.
//! - **registration**: The flows themselves, plus activation.
//! - **events**: Who gets told when registration finishes.
//! - **config**: Constants and defaults.
//!
//! ## Ground Rules
//!
//! 1. Nothing is written before the inputs are checked.
//! 2. The account id is written last. Half an identity reads as no identity.
//! 3. Secrets never reach a log line, a `Debug` impl, or an error message.
//! 4. Same phrase, same account. Across devices, across versions.

pub mod config;
pub mod conversation;
pub mod crypto;
pub mod events;
pub mod identity;
pub mod mnemonic;
pub mod registration;
pub mod storage;
pub mod sync;
