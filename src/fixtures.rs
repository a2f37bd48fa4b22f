//! Shared test documents

use crate::config::GuardConfig;
use crate::rules::RuleContext;

pub const VALID_WORKFLOW: &str = r#"name: Build AppImage

on:
  push:
    branches: [main]
    tags: ["v*"]
  pull_request:
    branches: [main]
  workflow_dispatch:
    inputs:
      create_release:
        description: Create a GitHub release from this run
        type: boolean
        default: false

permissions:
  contents: write
  actions: read

concurrency:
  group: ${{ github.workflow }}-${{ github.ref }}
  cancel-in-progress: true

jobs:
  build-appimage:
    runs-on: ubuntu-22.04
    timeout-minutes: 60
    steps:
      - name: Checkout
        uses: actions/checkout@v4
        with:
          fetch-depth: 0
      - name: Set up Python
        uses: actions/setup-python@v5
        with:
          python-version: "3.10"
      - name: Install system dependencies
        run: |
          sudo apt-get update
          sudo apt-get install -y \
            libgeos-dev libspatialindex-dev libgl1-mesa-dev \
            libxkbcommon-x11-0 libxcb-xinerama0 libfuse2
      - name: Build AppImage
        run: appimage-builder --recipe AppImageBuilder.yml --skip-test
      - name: Upload AppImage
        uses: actions/upload-artifact@v4
        with:
          name: flatcam-appimage
          path: ./*.AppImage
          retention-days: 14

  test-appimage:
    needs: build-appimage
    runs-on: ubuntu-22.04
    timeout-minutes: 20
    steps:
      - uses: actions/download-artifact@v4
        with:
          name: flatcam-appimage
      - name: Smoke test
        run: |
          chmod +x ./*.AppImage
          ./*.AppImage --appimage-extract-and-run --version

  create-release:
    needs: build-appimage
    if: always() && needs.build-appimage.result == 'success'
    runs-on: ubuntu-22.04
    timeout-minutes: 15
    steps:
      - uses: actions/download-artifact@v4
        with:
          name: flatcam-appimage
      - name: Publish release
        uses: softprops/action-gh-release@v2
        with:
          tag_name: ${{ github.ref_name }}
          name: FlatCAM ${{ github.ref_name }}
          body_path: RELEASE_NOTES.md
          files: ./*.AppImage
"#;

/// Smallest document that satisfies the trigger, permission and job rules
pub const MINIMAL_WORKFLOW: &str = r#"permissions: {contents: write, actions: read}
on:
  push:
    branches: [main]
    tags: ["v*"]
  workflow_dispatch:
    inputs:
      create_release:
        type: boolean
jobs:
  build-appimage:
    runs-on: ubuntu-22.04
    timeout-minutes: 45
  test-appimage:
    runs-on: ubuntu-22.04
    timeout-minutes: 15
  create-release:
    runs-on: ubuntu-22.04
    timeout-minutes: 10
    needs: build-appimage
    if: always() && needs.build-appimage.result == 'success'
"#;

pub const VALID_BUILDER: &str = r#"version: 1
AppDir:
  path: ./AppDir
  app_info:
    id: org.flatcam.FlatCAM
    name: FlatCAM
    icon: flatcam
    version: latest
    exec: usr/bin/python3
    exec_args: $APPDIR/usr/src/flatcam.py $@
  apt:
    arch: amd64
    include:
      - python3
      - python3-pyqt5
AppImage:
  arch: x86_64
  update-information: guess
"#;

pub fn valid_context() -> RuleContext {
    context(VALID_WORKFLOW)
}

/// Context with the given workflow and the valid builder file
pub fn context(workflow: &str) -> RuleContext {
    RuleContext::from_sources(&GuardConfig::default(), Some(workflow), Some(VALID_BUILDER))
}

/// Valid workflow with `from` replaced by `to`
pub fn patched(from: &str, to: &str) -> String {
    assert!(VALID_WORKFLOW.contains(from), "fixture does not contain {from:?}");
    VALID_WORKFLOW.replacen(from, to, 1)
}
