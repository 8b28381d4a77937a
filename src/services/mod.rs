// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod crawler;
pub mod encoding;
pub mod extractor;
pub mod favicon;
pub mod frontier;
pub mod logging;
pub mod output;
pub mod rules;
pub mod scanner;
pub mod targets;
