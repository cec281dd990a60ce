//! Late-bound COM automation through `IDispatch`.
//!
//! Excel is driven the way VBScript drives it: members are looked up by name
//! and invoked with VARIANT arguments. Ranges move as 2-D SAFEARRAYs so a
//! whole block is read or assigned in a single call.

#![cfg(windows)]

use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::ptr;

use windows::{
    core::{BSTR, GUID, HSTRING, PCWSTR},
    Win32::{
        Foundation::{DISP_E_EXCEPTION, DISP_E_PARAMNOTFOUND, VARIANT_BOOL},
        Globalization::GetSystemDefaultLCID,
        System::{
            Com::{
                CLSIDFromProgID, CoCreateInstance, IDispatch, CLSCTX_LOCAL_SERVER, DISPATCH_FLAGS,
                DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPATCH_PROPERTYPUT, DISPPARAMS, EXCEPINFO,
                SAFEARRAY, SAFEARRAYBOUND,
            },
            Ole::{
                SafeArrayCreate, SafeArrayDestroy, SafeArrayGetDim, SafeArrayGetElement,
                SafeArrayGetLBound, SafeArrayGetUBound, SafeArrayPutElement, DISPID_PROPERTYPUT,
            },
            Variant::{
                VARENUM, VARIANT, VARIANT_0_0_0, VT_ARRAY, VT_BOOL, VT_BSTR, VT_DATE, VT_DISPATCH,
                VT_EMPTY, VT_ERROR, VT_I2, VT_I4, VT_NULL, VT_R4, VT_R8, VT_VARIANT,
            },
        },
    },
};

// VARIANT payloads sit behind ManuallyDrop unions; fields are set with
// ptr::write so nothing is dropped on assignment.
fn variant_of(vt: VARENUM, fill: impl FnOnce(&mut VARIANT_0_0_0)) -> VARIANT {
    let mut v = VARIANT::default();
    unsafe {
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, vt);
        fill(&mut inner.Anonymous);
    }
    v
}

fn vt(v: &VARIANT) -> VARENUM {
    unsafe { v.Anonymous.Anonymous.vt }
}

pub fn variant_empty() -> VARIANT {
    VARIANT::default()
}

pub fn variant_bool(val: bool) -> VARIANT {
    variant_of(VT_BOOL, |p| unsafe {
        ptr::write(&mut p.boolVal, VARIANT_BOOL(if val { -1 } else { 0 }))
    })
}

pub fn variant_f64(val: f64) -> VARIANT {
    variant_of(VT_R8, |p| unsafe { ptr::write(&mut p.dblVal, val) })
}

pub fn variant_i32(val: i32) -> VARIANT {
    variant_of(VT_I4, |p| unsafe { ptr::write(&mut p.lVal, val) })
}

pub fn variant_str(val: &str) -> VARIANT {
    let bstr = BSTR::from(val);
    variant_of(VT_BSTR, |p| unsafe {
        ptr::write(&mut p.bstrVal, ManuallyDrop::new(bstr))
    })
}

/// Placeholder for an omitted optional positional argument.
pub fn variant_missing() -> VARIANT {
    variant_of(VT_ERROR, |p| unsafe {
        ptr::write(&mut p.scode, DISP_E_PARAMNOTFOUND.0)
    })
}

/// Pack equal-length rows into a 1-based 2-D `VT_ARRAY | VT_VARIANT`.
pub fn variant_grid(rows: &[Vec<VARIANT>]) -> Result<VARIANT, String> {
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, Vec::len) as u32;
    let bounds = [
        SAFEARRAYBOUND {
            cElements: height,
            lLbound: 1,
        },
        SAFEARRAYBOUND {
            cElements: width,
            lLbound: 1,
        },
    ];
    let psa = unsafe { SafeArrayCreate(VT_VARIANT, 2, bounds.as_ptr()) };
    if psa.is_null() {
        return Err(format!("SafeArrayCreate failed for {height}x{width}"));
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let indices = [r as i32 + 1, c as i32 + 1];
            let put = unsafe {
                SafeArrayPutElement(psa, indices.as_ptr(), value as *const VARIANT as *const c_void)
            };
            if let Err(e) = put {
                unsafe {
                    let _ = SafeArrayDestroy(psa);
                }
                return Err(format!("SafeArrayPutElement({r},{c}) failed: {e}"));
            }
        }
    }
    // Ownership of the array passes to the VARIANT
    Ok(variant_of(VARENUM(VT_ARRAY.0 | VT_VARIANT.0), |p| unsafe {
        ptr::write(&mut p.parray, psa)
    }))
}

/// Unpack a 2-D array VARIANT into rows. A non-array VARIANT gives `None`;
/// that is how `Range.Value` answers for a single cell.
pub fn variant_get_grid(v: &VARIANT) -> Result<Option<Vec<Vec<VARIANT>>>, String> {
    let kind = vt(v);
    if kind.0 & VT_ARRAY.0 == 0 {
        return Ok(None);
    }
    let psa: *const SAFEARRAY = unsafe { v.Anonymous.Anonymous.Anonymous.parray };
    if psa.is_null() || unsafe { SafeArrayGetDim(psa) } != 2 {
        return Err(format!("expected a 2-D array (VT={})", kind.0));
    }
    let bounds = |dim: u32| -> Result<(i32, i32), String> {
        unsafe {
            let lo = SafeArrayGetLBound(psa, dim).map_err(|e| format!("SafeArrayGetLBound: {e}"))?;
            let hi = SafeArrayGetUBound(psa, dim).map_err(|e| format!("SafeArrayGetUBound: {e}"))?;
            Ok((lo, hi))
        }
    };
    let (rows, cols) = (bounds(1)?, bounds(2)?);

    (rows.0..=rows.1)
        .map(|r| {
            (cols.0..=cols.1)
                .map(|c| -> Result<VARIANT, String> {
                    let indices = [r, c];
                    let mut elem = VARIANT::default();
                    unsafe {
                        SafeArrayGetElement(
                            psa,
                            indices.as_ptr(),
                            &mut elem as *mut VARIANT as *mut c_void,
                        )
                    }
                    .map_err(|e| format!("SafeArrayGetElement({r},{c}) failed: {e}"))?;
                    Ok(elem)
                })
                .collect::<Result<Vec<_>, String>>()
        })
        .collect::<Result<_, String>>()
        .map(Some)
}

pub fn variant_is_empty(v: &VARIANT) -> bool {
    matches!(vt(v), VT_EMPTY | VT_NULL)
}

pub fn variant_get_bool(v: &VARIANT) -> Option<bool> {
    (vt(v) == VT_BOOL).then(|| unsafe { v.Anonymous.Anonymous.Anonymous.boolVal.0 != 0 })
}

/// Numeric VARIANTs, including dates as their serial number.
pub fn variant_get_f64(v: &VARIANT) -> Option<f64> {
    let payload = unsafe { &v.Anonymous.Anonymous.Anonymous };
    unsafe {
        match vt(v) {
            VT_R8 => Some(payload.dblVal),
            VT_DATE => Some(payload.date),
            VT_R4 => Some(payload.fltVal as f64),
            VT_I4 => Some(payload.lVal as f64),
            VT_I2 => Some(payload.iVal as f64),
            _ => None,
        }
    }
}

pub fn variant_get_string(v: &VARIANT) -> Option<String> {
    (vt(v) == VT_BSTR).then(|| unsafe { v.Anonymous.Anonymous.Anonymous.bstrVal.to_string() })
}

/// SCODE of a `VT_ERROR`, e.g. a `CVErr` cell value.
pub fn variant_get_error(v: &VARIANT) -> Option<i32> {
    (vt(v) == VT_ERROR).then(|| unsafe { v.Anonymous.Anonymous.Anonymous.scode })
}

/// An `IDispatch` reference with name-based member access.
#[derive(Clone)]
pub struct DispatchObject {
    inner: IDispatch,
}

impl DispatchObject {
    /// Start a local server by ProgID, e.g. `"Excel.Application"`.
    pub fn create_from_progid(progid: &str) -> Result<Self, String> {
        unsafe {
            let clsid = CLSIDFromProgID(&HSTRING::from(progid))
                .map_err(|e| format!("CLSIDFromProgID failed: {e}"))?;
            let inner = CoCreateInstance(&clsid, None, CLSCTX_LOCAL_SERVER)
                .map_err(|e| format!("CoCreateInstance failed for '{progid}': {e}"))?;
            Ok(Self { inner })
        }
    }

    fn dispid(&self, name: &str) -> Result<i32, String> {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let names = [PCWSTR(wide.as_ptr())];
        let mut dispid = 0i32;
        unsafe {
            self.inner.GetIDsOfNames(
                &GUID::zeroed(),
                names.as_ptr(),
                1,
                GetSystemDefaultLCID(),
                &mut dispid,
            )
        }
        .map_err(|e| format!("GetIDsOfNames('{name}') failed: {e}"))?;
        Ok(dispid)
    }

    /// One `IDispatch::Invoke`. `args` are in call order; DISPPARAMS wants
    /// them reversed. A property put names its single argument, and Excel
    /// ignores the result slot for it.
    fn invoke(
        &self,
        name: &str,
        flags: DISPATCH_FLAGS,
        args: &[VARIANT],
    ) -> Result<VARIANT, String> {
        let dispid = self.dispid(name)?;
        let mut reversed: Vec<VARIANT> = args.iter().rev().cloned().collect();
        let mut put_id = [DISPID_PROPERTYPUT];
        let is_put = flags == DISPATCH_PROPERTYPUT;
        let params = DISPPARAMS {
            rgvarg: if reversed.is_empty() {
                ptr::null_mut()
            } else {
                reversed.as_mut_ptr()
            },
            rgdispidNamedArgs: if is_put {
                put_id.as_mut_ptr()
            } else {
                ptr::null_mut()
            },
            cArgs: reversed.len() as u32,
            cNamedArgs: u32::from(is_put),
        };
        let mut result = VARIANT::default();
        let mut except = EXCEPINFO::default();
        unsafe {
            self.inner.Invoke(
                dispid,
                &GUID::zeroed(),
                GetSystemDefaultLCID(),
                flags,
                &params,
                Some(&mut result),
                Some(&mut except),
                None,
            )
        }
        .map_err(|e| invoke_error(e, &except, name))?;
        Ok(result)
    }

    /// `obj.Name`
    pub fn get_property(&self, name: &str) -> Result<VARIANT, String> {
        self.invoke(name, DISPATCH_PROPERTYGET, &[])
    }

    /// `obj.Name = value`
    pub fn set_property(&self, name: &str, value: VARIANT) -> Result<(), String> {
        self.invoke(name, DISPATCH_PROPERTYPUT, &[value]).map(drop)
    }

    /// `obj.Name(args...)`
    pub fn invoke_method(&self, name: &str, args: &[VARIANT]) -> Result<VARIANT, String> {
        self.invoke(name, DISPATCH_METHOD, args)
    }

    pub fn get_child(&self, name: &str) -> Result<DispatchObject, String> {
        into_object(self.get_property(name)?, name)
    }

    pub fn invoke_child(&self, name: &str, args: &[VARIANT]) -> Result<DispatchObject, String> {
        into_object(self.invoke_method(name, args)?, name)
    }

    /// Indexed property such as `Worksheets("Data")` or `Range("A1:B2")`.
    pub fn get_indexed(&self, name: &str, index: &VARIANT) -> Result<DispatchObject, String> {
        into_object(
            self.invoke(name, DISPATCH_PROPERTYGET, std::slice::from_ref(index))?,
            name,
        )
    }
}

fn into_object(variant: VARIANT, member: &str) -> Result<DispatchObject, String> {
    match vt(&variant) {
        VT_DISPATCH => unsafe { (*variant.Anonymous.Anonymous.Anonymous.pdispVal).clone() }
            .map(|inner| DispatchObject { inner })
            .ok_or_else(|| format!("'{member}' returned a null object")),
        VT_EMPTY | VT_NULL => Err(format!("'{member}' returned empty/null")),
        other => Err(format!(
            "'{member}' returned VT={}, expected an object",
            other.0
        )),
    }
}

fn invoke_error(err: windows::core::Error, except: &EXCEPINFO, member: &str) -> String {
    if err.code() != DISP_E_EXCEPTION {
        return format!("Invoke('{member}') failed: {err}");
    }
    let or = |text: &BSTR, fallback: &str| {
        if text.is_empty() {
            fallback.to_string()
        } else {
            text.to_string()
        }
    };
    format!(
        "COM exception in '{member}': {} (source: {})",
        or(&except.bstrDescription, "(no description)"),
        or(&except.bstrSource, "(no source)")
    )
}
