// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use secrecy::ExposeSecret as _;

use crate::{
    error::Result,
    keygen::Role,
    nkey::{self, NKeyPair},
    report::Report,
    rng,
};

const CHALLENGE_LEN: usize = 32;

/// Walks through the challenge-response exchange a server performs when an
/// NKey user connects, entirely offline.
pub(super) fn run() -> Result<Report> {
    let mut report = Report::new("NKey Generation");

    report.section("1. Generating user key pairs:");
    let mut pairs = Vec::new();
    for role in [Role::Admin, Role::Client, Role::Service] {
        if let Some(pair) = report.expect_allowed(&format!("Generated {role} key pair"), NKeyPair::generate()) {
            println!("  Public Key: {}", pair.public_key());
            println!("  Seed:       {}", pair.seed().expose_secret());
            pairs.push(pair);
        }
    }
    let Some(signer) = pairs.first() else {
        return Ok(report);
    };

    report.section("2. Signing a server challenge:");
    let challenge = rng::bytes::<CHALLENGE_LEN>();
    println!("  Challenge: {}", base64::encode(challenge));
    let Some(signature) = report.expect_allowed("Client signed the challenge", signer.sign(&challenge)) else {
        return Ok(report);
    };
    println!("  Signature: {}", base64::encode(&signature));

    report.section("3. Verifying the signature with the public key:");
    _ = report.expect_allowed(
        "Signature verified with the signer's public key",
        nkey::verify(signer.public_key(), &challenge, &signature),
    );

    let mut tampered = challenge;
    tampered[0] ^= 0xff;
    report.expect_true(
        "Signature rejected for a tampered challenge",
        nkey::verify(signer.public_key(), &tampered, &signature).is_err(),
        format!("first byte flipped to {:#04x}", tampered[0]),
    );

    if let Some(other) = pairs.get(1) {
        report.expect_true(
            "Signature rejected for another user's public key",
            nkey::verify(other.public_key(), &challenge, &signature).is_err(),
            format!("checked against {}", other.public_key()),
        );
    }

    report.finish();
    Ok(report)
}
