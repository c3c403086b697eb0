//! Cocoa bindings for bookmarks and icons.

use std::ffi::{c_char, c_void, CStr};
use std::path::{Path, PathBuf};
use std::slice;

use cocoa::base::{id, nil, BOOL, NO, YES};
use cocoa::foundation::{NSSize, NSString as CocoaNSString};
use objc::{class, msg_send, sel, sel_impl};

use crate::bundle::AppIcon;

// NSURLBookmarkCreationOptions / NSURLBookmarkResolutionOptions
const BOOKMARK_CREATION_WITH_SECURITY_SCOPE: u64 = 1 << 11;
const BOOKMARK_RESOLUTION_WITH_SECURITY_SCOPE: u64 = 1 << 10;

// NSBitmapImageFileType
const NS_PNG_FILE_TYPE: u64 = 4;

/// An NSURL we hold a +1 retain on
#[derive(Debug)]
pub(super) struct RetainedUrl(id);

impl Drop for RetainedUrl {
    fn drop(&mut self) {
        // SAFETY: we took ownership of exactly one retain in resolve_bookmark
        unsafe {
            let _: () = msg_send![self.0, release];
        }
    }
}

unsafe fn ns_string(s: &str) -> id {
    CocoaNSString::alloc(nil).init_str(s)
}

unsafe fn release(obj: id) {
    if obj != nil {
        let _: () = msg_send![obj, release];
    }
}

unsafe fn to_string(s: id) -> Option<String> {
    if s == nil {
        return None;
    }
    let ptr: *const c_char = msg_send![s, UTF8String];
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

unsafe fn describe(error: id) -> String {
    if error == nil {
        return "unknown error".to_string();
    }
    let description: id = msg_send![error, localizedDescription];
    to_string(description).unwrap_or_else(|| "unknown error".to_string())
}

unsafe fn data_bytes(data: id) -> Vec<u8> {
    let length: usize = msg_send![data, length];
    let bytes: *const u8 = msg_send![data, bytes];
    if bytes.is_null() || length == 0 {
        return Vec::new();
    }
    slice::from_raw_parts(bytes, length).to_vec()
}

pub(super) fn create_bookmark(dir: &Path) -> Result<Vec<u8>, String> {
    let path_str = dir
        .to_str()
        .ok_or_else(|| format!("{} is not valid UTF-8", dir.display()))?;

    // SAFETY: plain Foundation calls; every object is nil-checked before use
    unsafe {
        let ns_path = ns_string(path_str);
        let url: id = msg_send![class!(NSURL), fileURLWithPath: ns_path isDirectory: YES];
        release(ns_path);
        if url == nil {
            return Err(format!("could not create a URL for {}", dir.display()));
        }

        let mut error: id = nil;
        let data: id = msg_send![
            url,
            bookmarkDataWithOptions: BOOKMARK_CREATION_WITH_SECURITY_SCOPE
            includingResourceValuesForKeys: nil
            relativeToURL: nil
            error: &mut error as *mut id
        ];
        if data == nil {
            return Err(describe(error));
        }

        let bytes = data_bytes(data);
        if bytes.is_empty() {
            return Err("bookmark data was empty".to_string());
        }
        Ok(bytes)
    }
}

pub(super) fn resolve_bookmark(token: &[u8]) -> Result<(RetainedUrl, PathBuf, bool), String> {
    if token.is_empty() {
        return Err("empty token".to_string());
    }

    // SAFETY: NSData copies `token`; the resolved URL is retained before
    // the autorelease pool can drain it
    unsafe {
        let data: id = msg_send![
            class!(NSData),
            dataWithBytes: token.as_ptr() as *const c_void
            length: token.len()
        ];
        if data == nil {
            return Err("could not wrap bookmark data".to_string());
        }

        let mut is_stale: BOOL = NO;
        let mut error: id = nil;
        let url: id = msg_send![
            class!(NSURL),
            URLByResolvingBookmarkData: data
            options: BOOKMARK_RESOLUTION_WITH_SECURITY_SCOPE
            relativeToURL: nil
            bookmarkDataIsStale: &mut is_stale as *mut BOOL
            error: &mut error as *mut id
        ];
        if url == nil {
            return Err(describe(error));
        }

        let _: id = msg_send![url, retain];
        let retained = RetainedUrl(url);

        let ns_path: id = msg_send![url, path];
        let path = to_string(ns_path)
            .map(PathBuf::from)
            .ok_or_else(|| "resolved bookmark has no path".to_string())?;

        Ok((retained, path, is_stale != NO))
    }
}

pub(super) fn start_accessing(url: &RetainedUrl) -> bool {
    // SAFETY: url is a live, retained NSURL
    unsafe {
        let granted: BOOL = msg_send![url.0, startAccessingSecurityScopedResource];
        granted != NO
    }
}

pub(super) fn stop_accessing(url: &RetainedUrl) {
    // SAFETY: url is a live, retained NSURL
    unsafe {
        let _: () = msg_send![url.0, stopAccessingSecurityScopedResource];
    }
}

/// Load the image for `icon`, returning a +1 retained NSImage or nil.
unsafe fn load_image(icon: &AppIcon, bundle_path: &Path) -> id {
    if let AppIcon::Resource(file) = icon {
        if let Some(file_str) = file.to_str() {
            let ns_path = ns_string(file_str);
            let image: id = msg_send![class!(NSImage), alloc];
            let image: id = msg_send![image, initWithContentsOfFile: ns_path];
            release(ns_path);
            if image != nil {
                return image;
            }
        }
    }

    let Some(bundle_str) = bundle_path.to_str() else {
        return nil;
    };
    let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
    if workspace == nil {
        return nil;
    }
    let ns_path = ns_string(bundle_str);
    let image: id = msg_send![workspace, iconForFile: ns_path];
    release(ns_path);
    if image != nil {
        let _: id = msg_send![image, retain];
    }
    image
}

pub(super) fn icon_png(icon: &AppIcon, bundle_path: &Path, size: f64) -> Option<Vec<u8>> {
    // SAFETY: every object is nil-checked; the only owned reference
    // (the image) is released on every path
    unsafe {
        let image = load_image(icon, bundle_path);
        if image == nil {
            return None;
        }

        let _: () = msg_send![image, setSize: NSSize::new(size, size)];

        let tiff_data: id = msg_send![image, TIFFRepresentation];
        let png = if tiff_data == nil {
            None
        } else {
            let bitmap_rep: id =
                msg_send![class!(NSBitmapImageRep), imageRepWithData: tiff_data];
            if bitmap_rep == nil {
                None
            } else {
                let empty_dict: id = msg_send![class!(NSDictionary), dictionary];
                let png_data: id = msg_send![
                    bitmap_rep,
                    representationUsingType: NS_PNG_FILE_TYPE
                    properties: empty_dict
                ];
                if png_data == nil {
                    None
                } else {
                    Some(data_bytes(png_data)).filter(|bytes| !bytes.is_empty())
                }
            }
        };

        release(image);
        png
    }
}
