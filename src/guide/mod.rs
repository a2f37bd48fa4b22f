//! Manual-test guidance for the AppImage release process
//!
//! The validator covers what can be checked statically. These topics cover
//! the steps that need a person, a runner or a published tag.

use std::fmt;

/// A named guidance printout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    LocalBuild,
    ManualTrigger,
    TagRelease,
    Artifacts,
    Timings,
    Troubleshooting,
}

impl Topic {
    pub fn all() -> &'static [Topic] {
        &[
            Self::LocalBuild,
            Self::ManualTrigger,
            Self::TagRelease,
            Self::Artifacts,
            Self::Timings,
            Self::Troubleshooting,
        ]
    }

    /// Command-line name of the topic
    pub fn name(self) -> &'static str {
        match self {
            Self::LocalBuild => "local-build",
            Self::ManualTrigger => "manual-trigger",
            Self::TagRelease => "tag-release",
            Self::Artifacts => "artifacts",
            Self::Timings => "timings",
            Self::Troubleshooting => "troubleshooting",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::all().iter().copied().find(|t| t.name() == name)
    }

    pub fn summary(self) -> &'static str {
        match self {
            Self::LocalBuild => "Build and smoke-test the AppImage on a local machine",
            Self::ManualTrigger => "Run the workflow by hand from the Actions tab",
            Self::TagRelease => "Publish a release by pushing a version tag",
            Self::Artifacts => "Download and inspect the uploaded AppImage artifact",
            Self::Timings => "Expected duration of each job",
            Self::Troubleshooting => "Common failures and how to resolve them",
        }
    }

    /// Full guidance text for the topic
    pub fn render(self) -> String {
        let body = match self {
            Self::LocalBuild => LOCAL_BUILD,
            Self::ManualTrigger => MANUAL_TRIGGER,
            Self::TagRelease => TAG_RELEASE,
            Self::Artifacts => ARTIFACTS,
            Self::Timings => TIMINGS,
            Self::Troubleshooting => TROUBLESHOOTING,
        };
        format!("{}\n{}\n\n{}", self.summary(), "=".repeat(self.summary().len()), body)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Usage text listing every topic
pub fn help_listing() -> String {
    let mut listing = String::from("Usage: release-test-guide <TOPIC>\n\nTopics:\n");
    for topic in Topic::all() {
        listing.push_str(&format!("  {:<16} {}\n", topic.name(), topic.summary()));
    }
    listing
}

const LOCAL_BUILD: &str = "\
1. Install the system packages the workflow installs:
     sudo apt-get install -y libgeos-dev libspatialindex-dev libgl1-mesa-dev \\
       libxkbcommon-x11-0 libxcb-xinerama0 libfuse2
2. Create a Python 3.10 virtual environment and install requirements.txt.
3. Install appimage-builder and run:
     appimage-builder --recipe AppImageBuilder.yml --skip-test
4. Run the result with --appimage-extract-and-run --version and confirm it
   prints the application version.
5. Launch the AppImage without arguments and open a Gerber file to check
   that the OpenGL canvas renders.
";

const MANUAL_TRIGGER: &str = "\
1. Open the repository's Actions tab and select the Build AppImage workflow.
2. Choose \"Run workflow\" and pick the branch to build.
3. Leave create_release unchecked for a test build; check it only when a
   release should be published from this run.
4. Confirm that build-appimage and test-appimage both complete and that
   create-release is skipped when create_release is false.
5. Start a second run on the same branch while the first is running and
   confirm the first is cancelled.
";

const TAG_RELEASE: &str = "\
1. Make sure main is green and RELEASE_NOTES.md describes the release.
2. Create and push a version tag:
     git tag v1.2.3
     git push origin v1.2.3
3. Watch the workflow run triggered by the tag.
4. When create-release finishes, open the Releases page and check the
   title, the release notes and the attached .AppImage file.
5. Download the attached AppImage and run it on a clean machine.
";

const ARTIFACTS: &str = "\
1. Open a completed workflow run and scroll to the Artifacts section.
2. Download flatcam-appimage and unzip it.
3. Mark the AppImage executable (chmod +x) and run it with --version.
4. Artifacts expire after the configured retention-days; download them
   before then if they are needed for a later comparison.
";

const TIMINGS: &str = "\
Typical durations on ubuntu-22.04 hosted runners:
  build-appimage   15-30 minutes (timeout 60)
  test-appimage     2-5 minutes  (timeout 20)
  create-release    1-2 minutes  (timeout 15)
A build that regularly comes close to its timeout usually means a
dependency is being compiled from source instead of installed as a wheel.
";

const TROUBLESHOOTING: &str = "\
Build fails with \"libfuse.so.2: cannot open shared object file\":
  libfuse2 is missing from the system packages step.
Python version resolves to 3.1:
  python-version was written unquoted; quote it as \"3.10\".
Release job is skipped after a successful build:
  its if condition needs always() together with a check that
  build-appimage succeeded.
Release creation fails with 403:
  the workflow needs contents: write permission.
AppImage starts but shows a blank canvas:
  libgl1-mesa-dev or the xcb libraries are missing from the runtime.
Run `workflow-guardian check` to catch most of these before pushing.
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_topic_round_trips_by_name() {
        for topic in Topic::all() {
            assert_eq!(Topic::from_name(topic.name()), Some(*topic));
        }
        assert_eq!(Topic::from_name("Tag-Release"), Some(Topic::TagRelease));
        assert_eq!(Topic::from_name("deploy"), None);
    }

    #[test]
    fn test_render_has_heading_and_body() {
        let text = Topic::TagRelease.render();
        assert!(text.starts_with("Publish a release by pushing a version tag\n===="));
        assert!(text.contains("git push origin v1.2.3"));
    }

    #[test]
    fn test_help_listing_names_every_topic() {
        let listing = help_listing();
        for topic in Topic::all() {
            assert!(listing.contains(topic.name()));
        }
    }
}
