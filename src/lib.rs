// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod aggregates;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod logging;
pub mod models;
pub mod notify;
pub mod orders;
pub mod projection;
pub mod registry;
pub mod service;
pub mod utils;
